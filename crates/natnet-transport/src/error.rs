use std::net::{Ipv4Addr, SocketAddr};

/// Errors that can occur in NatNet transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create or bind a socket to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to join the multicast group on the given interface.
    #[error("failed to join multicast group {group} on {interface}: {source}")]
    JoinMulticast {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        source: std::io::Error,
    },

    /// Failed to apply a socket option.
    #[error("failed to set {option}: {source}")]
    Configure {
        option: &'static str,
        source: std::io::Error,
    },

    /// Failed to send a datagram.
    #[error("failed to send to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// An I/O error occurred while receiving.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
