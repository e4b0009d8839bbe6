//! NatNet client sessions.
//!
//! A [`Session`] opens the command and data sockets, runs one receive loop
//! per socket, negotiates the stream version with the server and delivers
//! decoded frames and model definitions to a [`SessionListener`].

pub mod command;
pub mod config;
pub mod error;
pub mod listener;
mod receiver;
pub mod session;
pub mod state;

pub use command::{ResetStep, COMMAND_ATTEMPTS, PLAYBACK_RESET_SEQUENCE};
pub use config::{SessionConfig, DEFAULT_COMMAND_PORT};
pub use error::{Result, SessionError};
pub use listener::{SessionEvent, SessionListener};
pub use session::Session;
pub use state::{BitstreamVerdict, SessionPhase, SessionState};
