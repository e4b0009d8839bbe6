use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use natnet_transport::{NatNetSocket, TransportError};
use natnet_wire::{encode_bare, encode_command, encode_connect, MessageKind, ProtocolVersion};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// Send attempts per request before it is reported as failed.
pub const COMMAND_ATTEMPTS: u32 = 3;

/// One step of the playback reset that follows an accepted bitstream change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    Command(&'static str),
    /// Wait `resync_delay`.
    Resync,
    /// Wait `settle_delay`.
    Settle,
}

/// Commands sent after the server accepts a new bitstream version, in order.
pub const PLAYBACK_RESET_SEQUENCE: [ResetStep; 7] = [
    ResetStep::Command("TimelinePlay"),
    ResetStep::Resync,
    ResetStep::Command("TimelinePlay"),
    ResetStep::Command("TimelineStop"),
    ResetStep::Command("SetPlaybackCurrentFrame,0"),
    ResetStep::Command("TimelineStop"),
    ResetStep::Settle,
];

/// Sends requests from the command socket to the server's command port.
#[derive(Debug)]
pub(crate) struct CommandSender {
    socket: NatNetSocket,
    server: SocketAddr,
}

impl CommandSender {
    pub(crate) fn new(socket: NatNetSocket, server: SocketAddr) -> Self {
        Self { socket, server }
    }

    pub(crate) fn server(&self) -> SocketAddr {
        self.server
    }

    pub(crate) fn send_connect(&self, version: ProtocolVersion) -> Result<usize> {
        let mut buf = BytesMut::new();
        encode_connect(version, &mut buf)?;
        self.send_with_retry(MessageKind::Connect.name(), &buf)
    }

    pub(crate) fn send_command(&self, command: &str) -> Result<usize> {
        let mut buf = BytesMut::new();
        encode_command(command, &mut buf)?;
        self.send_with_retry(command, &buf)
    }

    pub(crate) fn send_bare(&self, kind: MessageKind) -> Result<usize> {
        let mut buf = BytesMut::new();
        encode_bare(kind, &mut buf)?;
        self.send_with_retry(kind.name(), &buf)
    }

    /// Run [`PLAYBACK_RESET_SEQUENCE`]. A failed command is logged and the
    /// sequence continues.
    pub(crate) fn send_playback_reset(&self, resync: Duration, settle: Duration) {
        for step in PLAYBACK_RESET_SEQUENCE {
            match step {
                ResetStep::Command(command) => {
                    if let Err(err) = self.send_command(command) {
                        warn!(command, error = %err, "playback reset command failed");
                    }
                }
                ResetStep::Resync => std::thread::sleep(resync),
                ResetStep::Settle => std::thread::sleep(settle),
            }
        }
    }

    fn send_with_retry(&self, label: &str, datagram: &[u8]) -> Result<usize> {
        let mut last_error = None;
        for attempt in 1..=COMMAND_ATTEMPTS {
            match self.socket.send_to(datagram, self.server) {
                Ok(sent) => {
                    debug!(request = label, bytes = sent, attempt, "request sent");
                    return Ok(sent);
                }
                Err(TransportError::Shutdown) => {
                    return Err(SessionError::CommandFailed {
                        command: label.to_string(),
                        attempts: attempt,
                        source: TransportError::Shutdown,
                    });
                }
                Err(err) => {
                    debug!(request = label, attempt, error = %err, "send attempt failed");
                    last_error = Some(err);
                }
            }
        }
        Err(SessionError::CommandFailed {
            command: label.to_string(),
            attempts: COMMAND_ATTEMPTS,
            source: last_error.unwrap_or(TransportError::Shutdown),
        })
    }
}
