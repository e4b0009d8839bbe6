//! UDP socket creation for the NatNet command and data channels.
//!
//! The command channel talks to the server's command port. The data channel
//! receives frames, either on a multicast group (joined on the local
//! interface) or on an ephemeral unicast port the server replies to.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::socket::{NatNetSocket, SocketRole};

/// Default NatNet multicast group.
pub const DEFAULT_MULTICAST_ADDRESS: Ipv4Addr = Ipv4Addr::new(239, 255, 42, 99);

/// Default server data port.
pub const DEFAULT_DATA_PORT: u16 = 1511;

/// Default read timeout; bounds how long a receive loop waits before it
/// re-checks its stop flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Socket-level settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Local interface address.
    pub local_address: Ipv4Addr,
    pub multicast_address: Ipv4Addr,
    pub data_port: u16,
    pub use_multicast: bool,
    /// Read timeout applied to both sockets.
    pub poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            local_address: Ipv4Addr::LOCALHOST,
            multicast_address: DEFAULT_MULTICAST_ADDRESS,
            data_port: DEFAULT_DATA_PORT,
            use_multicast: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TransportConfig {
    pub fn with_local_address(mut self, addr: Ipv4Addr) -> Self {
        self.local_address = addr;
        self
    }

    pub fn with_multicast_address(mut self, addr: Ipv4Addr) -> Self {
        self.multicast_address = addr;
        self
    }

    pub fn with_data_port(mut self, port: u16) -> Self {
        self.data_port = port;
        self
    }

    pub fn with_multicast(mut self, enabled: bool) -> Self {
        self.use_multicast = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn new_udp_socket(addr: SocketAddr) -> Result<Socket> {
    Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|source| TransportError::Bind { addr, source })
}

fn configure(result: std::io::Result<()>, option: &'static str) -> Result<()> {
    result.map_err(|source| TransportError::Configure { option, source })
}

fn bind(socket: &Socket, addr: SocketAddr) -> Result<()> {
    socket
        .bind(&addr.into())
        .map_err(|source| TransportError::Bind { addr, source })
}

fn finish(socket: Socket, role: SocketRole, config: &TransportConfig) -> Result<NatNetSocket> {
    let socket: UdpSocket = socket.into();
    let socket = NatNetSocket::new(socket, role);
    socket.set_read_timeout(Some(config.poll_interval))?;
    Ok(socket)
}

/// Open the command socket.
///
/// Unicast binds an ephemeral port on the local interface. Multicast binds
/// the wildcard address with `SO_BROADCAST` set.
pub fn open_command_socket(config: &TransportConfig) -> Result<NatNetSocket> {
    let ip = if config.use_multicast {
        Ipv4Addr::UNSPECIFIED
    } else {
        config.local_address
    };
    let addr = SocketAddr::V4(SocketAddrV4::new(ip, 0));

    let socket = new_udp_socket(addr)?;
    configure(socket.set_reuse_address(true), "SO_REUSEADDR")?;
    if config.use_multicast {
        configure(socket.set_broadcast(true), "SO_BROADCAST")?;
    }
    bind(&socket, addr)?;

    let socket = finish(socket, SocketRole::Command, config)?;
    info!(
        local = %socket.local_addr()?,
        multicast = config.use_multicast,
        "command socket bound"
    );
    Ok(socket)
}

/// Open the data socket.
///
/// Multicast binds `0.0.0.0:data_port` with `SO_REUSEADDR` and joins the
/// group on the local interface. Unicast binds an ephemeral port.
pub fn open_data_socket(config: &TransportConfig) -> Result<NatNetSocket> {
    let port = if config.use_multicast { config.data_port } else { 0 };
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));

    let socket = new_udp_socket(addr)?;
    configure(socket.set_reuse_address(true), "SO_REUSEADDR")?;
    bind(&socket, addr)?;

    if config.use_multicast {
        socket
            .join_multicast_v4(&config.multicast_address, &config.local_address)
            .map_err(|source| TransportError::JoinMulticast {
                group: config.multicast_address,
                interface: config.local_address,
                source,
            })?;
    }

    let socket = finish(socket, SocketRole::Data, config)?;
    info!(
        local = %socket.local_addr()?,
        group = %config.multicast_address,
        multicast = config.use_multicast,
        "data socket bound"
    );
    Ok(socket)
}
