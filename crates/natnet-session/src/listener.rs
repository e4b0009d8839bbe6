use std::sync::mpsc::Sender;

use natnet_transport::SocketRole;
use natnet_wire::{
    CommandResponse, FrameOfData, MessageKind, ModelDefinitions, ServerInfo, WireError,
};
use tracing::{debug, info};

use crate::error::SessionError;

/// Receives decoded traffic from a session.
///
/// Methods run on the receive loop threads: frames on the data loop, the
/// rest on the command loop (frames can also arrive there in unicast).
/// Implementations should return quickly.
pub trait SessionListener: Send + Sync + 'static {
    fn on_frame(&self, frame: FrameOfData);

    fn on_description(&self, definitions: ModelDefinitions);

    fn on_server_info(&self, info: &ServerInfo) {
        let _ = info;
    }

    /// A MessageString from the server.
    fn on_message(&self, text: &str) {
        info!(message = text, "server message");
    }

    fn on_response(&self, response: &CommandResponse) {
        debug!(?response, "command response");
    }

    /// A payload failed to decode. The loop keeps running.
    fn on_decode_error(&self, kind: Option<MessageKind>, error: &WireError) {
        let _ = (kind, error);
    }

    /// A receive loop ended; `error` is `None` after a normal shutdown.
    fn on_loop_exit(&self, role: SocketRole, error: Option<&SessionError>) {
        let _ = (role, error);
    }
}

/// Session traffic as messages, for consumers that prefer a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Frame(FrameOfData),
    Description(ModelDefinitions),
    ServerInfo(ServerInfo),
    Message(String),
    Response(CommandResponse),
    DecodeError {
        kind: Option<MessageKind>,
        error: WireError,
    },
    LoopExit {
        role: SocketRole,
        error: Option<String>,
    },
}

// A dropped receiver just discards events.
impl SessionListener for Sender<SessionEvent> {
    fn on_frame(&self, frame: FrameOfData) {
        let _ = self.send(SessionEvent::Frame(frame));
    }

    fn on_description(&self, definitions: ModelDefinitions) {
        let _ = self.send(SessionEvent::Description(definitions));
    }

    fn on_server_info(&self, info: &ServerInfo) {
        let _ = self.send(SessionEvent::ServerInfo(info.clone()));
    }

    fn on_message(&self, text: &str) {
        let _ = self.send(SessionEvent::Message(text.to_string()));
    }

    fn on_response(&self, response: &CommandResponse) {
        let _ = self.send(SessionEvent::Response(response.clone()));
    }

    fn on_decode_error(&self, kind: Option<MessageKind>, error: &WireError) {
        let _ = self.send(SessionEvent::DecodeError {
            kind,
            error: error.clone(),
        });
    }

    fn on_loop_exit(&self, role: SocketRole, error: Option<&SessionError>) {
        let _ = self.send(SessionEvent::LoopExit {
            role,
            error: error.map(ToString::to_string),
        });
    }
}
