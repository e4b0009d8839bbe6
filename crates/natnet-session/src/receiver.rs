use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use natnet_transport::{NatNetSocket, SocketRole, TransportError};
use natnet_wire::{
    decode_message, decode_text, peek_kind, AssetFilter, CommandResponse, FrameDecoder,
    MessageKind, ModelDecoder, ServerInfo, MAX_DATAGRAM_SIZE,
};
use tracing::{debug, trace, warn};

use crate::command::CommandSender;
use crate::error::Result;
use crate::listener::SessionListener;
use crate::state::SessionState;

/// State shared between the session owner and its receive loops.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: Mutex<SessionState>,
    /// Signalled whenever the command loop changes `state`.
    pub(crate) changed: Condvar,
    pub(crate) stop: AtomicBool,
}

impl Shared {
    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let result = f(&mut self.state());
        self.changed.notify_all();
        result
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Idle keep-alive for the unicast command channel.
#[derive(Debug)]
pub(crate) struct KeepAlive {
    pub(crate) sender: CommandSender,
    pub(crate) interval: Duration,
}

/// One receive loop: reads datagrams from its socket and dispatches them.
pub(crate) struct ReceiveLoop {
    pub(crate) socket: NatNetSocket,
    pub(crate) shared: Arc<Shared>,
    pub(crate) listener: Arc<dyn SessionListener>,
    pub(crate) filter: AssetFilter,
    pub(crate) use_multicast: bool,
    pub(crate) keep_alive: Option<KeepAlive>,
}

impl ReceiveLoop {
    pub(crate) fn role(&self) -> SocketRole {
        self.socket.role()
    }

    /// Run until the stop flag is set or the socket fails.
    pub(crate) fn run(self) -> Result<()> {
        let role = self.role();
        debug!(%role, "receive loop started");

        let result = self.receive();
        if let Err(err) = &result {
            warn!(%role, error = %err, "receive loop failed");
        }
        self.listener.on_loop_exit(role, result.as_ref().err());

        debug!(%role, "receive loop stopped");
        result
    }

    fn receive(&self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut idle_since = Instant::now();

        while !self.shared.should_stop() {
            match self.socket.recv(&mut buf) {
                Ok(Some((len, from))) => {
                    trace!(role = %self.role(), %from, len, "datagram received");
                    idle_since = Instant::now();
                    self.dispatch(&buf[..len]);
                }
                Ok(None) => {
                    if let Some(keep_alive) = &self.keep_alive {
                        if idle_since.elapsed() >= keep_alive.interval {
                            if let Err(err) = keep_alive.sender.send_bare(MessageKind::KeepAlive) {
                                warn!(error = %err, "keep-alive failed");
                            }
                            idle_since = Instant::now();
                        }
                    }
                }
                Err(TransportError::Shutdown) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    pub(crate) fn dispatch(&self, datagram: &[u8]) {
        let msg = match decode_message(datagram) {
            Ok(msg) => msg,
            Err(err) => {
                let kind = peek_kind(datagram).ok();
                warn!(role = %self.role(), error = %err, "dropping malformed datagram");
                self.listener.on_decode_error(kind, &err);
                return;
            }
        };
        debug!(role = %self.role(), kind = %msg.kind, len = msg.payload.len(), "dispatch");

        if let Err(err) = self.handle(msg.kind, msg.payload) {
            warn!(role = %self.role(), kind = %msg.kind, error = %err, "decode failed");
            self.listener.on_decode_error(Some(msg.kind), &err);
        }
    }

    fn handle(&self, kind: MessageKind, payload: &[u8]) -> natnet_wire::Result<()> {
        match kind {
            MessageKind::FrameOfData => {
                let version = self.shared.state().requested_version();
                let frame = FrameDecoder::for_version(version)?
                    .with_filter(self.filter)
                    .decode_payload(payload)?;
                self.listener.on_frame(frame);
            }
            MessageKind::ModelDef => {
                let definitions = ModelDecoder::new()
                    .with_filter(self.filter)
                    .decode_payload(payload)?;
                self.listener.on_description(definitions);
            }
            MessageKind::MessageString => {
                self.listener.on_message(&decode_text(payload));
            }
            MessageKind::ServerInfo
            | MessageKind::Response
            | MessageKind::UnrecognizedRequest
            | MessageKind::Disconnect
                if self.role() == SocketRole::Data =>
            {
                debug!(%kind, "negotiation message on data channel ignored");
            }
            MessageKind::ServerInfo => {
                let info = ServerInfo::decode(payload)?;
                self.shared
                    .update(|state| state.apply_server_info(&info, self.use_multicast));
                self.listener.on_server_info(&info);
            }
            MessageKind::Response => {
                let response = CommandResponse::decode(payload)?;
                self.shared.update(|state| state.apply_response(&response));
                self.listener.on_response(&response);
            }
            MessageKind::UnrecognizedRequest => {
                warn!("server did not recognize a request");
                self.shared.update(SessionState::apply_unrecognized);
            }
            MessageKind::Disconnect => {
                self.shared.update(SessionState::apply_disconnect);
            }
            MessageKind::Connect
            | MessageKind::Request
            | MessageKind::RequestModelDef
            | MessageKind::RequestFrameOfData
            | MessageKind::KeepAlive => {
                debug!(%kind, "client request echoed by server ignored");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ReceiveLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveLoop")
            .field("socket", &self.socket)
            .field("filter", &self.filter)
            .field("use_multicast", &self.use_multicast)
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}
