use std::time::Duration;

use natnet_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Wire-level error.
    #[error("wire error: {0}")]
    Wire(#[from] natnet_wire::WireError),

    /// `startup` was called on a running session.
    #[error("session already started")]
    AlreadyStarted,

    /// The operation needs a running session.
    #[error("session not started")]
    NotStarted,

    /// Every send attempt for a command failed.
    #[error("command {command:?} failed after {attempts} attempts: {source}")]
    CommandFailed {
        command: String,
        attempts: u32,
        source: TransportError,
    },

    /// The bitstream change was refused locally or by the server.
    #[error("bitstream change rejected: {0}")]
    BitstreamChangeRejected(String),

    /// The server did not answer in time.
    #[error("no response after {0:?}")]
    ResponseTimeout(Duration),

    /// A receive loop panicked instead of returning.
    #[error("{0} loop panicked")]
    LoopPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, SessionError>;
