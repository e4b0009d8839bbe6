//! UDP transport for NatNet clients.
//!
//! Provides the two sockets a NatNet session needs:
//! - a command socket for requests, replies and keep-alives
//! - a data socket for the frame stream, unicast or multicast
//!
//! This is the lowest layer of the workspace. The session layer drives
//! receive loops over the [`NatNetSocket`] type provided here.

pub mod error;
pub mod socket;
pub mod udp;

pub use error::{Result, TransportError};
pub use socket::{NatNetSocket, SocketRole};
pub use udp::{
    open_command_socket, open_data_socket, TransportConfig, DEFAULT_DATA_PORT,
    DEFAULT_MULTICAST_ADDRESS, DEFAULT_POLL_INTERVAL,
};
