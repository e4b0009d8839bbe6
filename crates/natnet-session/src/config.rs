use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use natnet_transport::{TransportConfig, DEFAULT_DATA_PORT, DEFAULT_MULTICAST_ADDRESS};
use natnet_wire::{AssetFilter, ProtocolVersion};

/// Default server command port.
pub const DEFAULT_COMMAND_PORT: u16 = 1510;

/// Configuration for a NatNet session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Address of the NatNet server.
    pub server_address: Ipv4Addr,
    /// Local interface used for binding and multicast membership.
    pub local_address: Ipv4Addr,
    /// Multicast group the server streams frames to.
    pub multicast_address: Ipv4Addr,
    /// Server command port.
    pub command_port: u16,
    /// Server data port (multicast only).
    pub data_port: u16,
    pub use_multicast: bool,
    /// Version announced in the Connect request.
    pub connect_version: ProtocolVersion,
    /// Idle time on the unicast command channel before a keep-alive is sent.
    pub keep_alive_interval: Duration,
    /// Socket read timeout; bounds shutdown latency.
    pub poll_interval: Duration,
    /// How long to wait for a bitstream verdict.
    pub response_timeout: Duration,
    /// Pause between the two `TimelinePlay` commands of a playback reset.
    pub resync_delay: Duration,
    /// Pause after a playback reset before returning.
    pub settle_delay: Duration,
    /// Kinds the decoders keep.
    pub filter: AssetFilter,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_address: Ipv4Addr::LOCALHOST,
            local_address: Ipv4Addr::LOCALHOST,
            multicast_address: DEFAULT_MULTICAST_ADDRESS,
            command_port: DEFAULT_COMMAND_PORT,
            data_port: DEFAULT_DATA_PORT,
            use_multicast: true,
            connect_version: ProtocolVersion::DEFAULT_CONNECT,
            keep_alive_interval: Duration::from_secs(2),
            poll_interval: Duration::from_millis(250),
            response_timeout: Duration::from_secs(2),
            resync_delay: Duration::from_millis(100),
            settle_delay: Duration::from_secs(2),
            filter: AssetFilter::all(),
        }
    }
}

impl SessionConfig {
    pub fn with_server_address(mut self, addr: Ipv4Addr) -> Self {
        self.server_address = addr;
        self
    }

    pub fn with_local_address(mut self, addr: Ipv4Addr) -> Self {
        self.local_address = addr;
        self
    }

    pub fn with_multicast_address(mut self, addr: Ipv4Addr) -> Self {
        self.multicast_address = addr;
        self
    }

    pub fn with_command_port(mut self, port: u16) -> Self {
        self.command_port = port;
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

    pub fn with_connect_version(mut self, version: ProtocolVersion) -> Self {
        self.connect_version = version;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set both playback-reset pauses.
    pub fn with_reset_delays(mut self, resync: Duration, settle: Duration) -> Self {
        self.resync_delay = resync;
        self.settle_delay = settle;
        self
    }

    pub fn with_filter(mut self, filter: AssetFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Server command endpoint.
    pub fn command_endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.server_address, self.command_port))
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig::default()
            .with_local_address(self.local_address)
            .with_multicast_address(self.multicast_address)
            .with_data_port(self.data_port)
            .with_multicast(self.use_multicast)
            .with_poll_interval(self.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.command_endpoint(), "127.0.0.1:1510".parse().unwrap());
        assert_eq!(config.data_port, 1511);
        assert_eq!(config.multicast_address, Ipv4Addr::new(239, 255, 42, 99));
        assert_eq!(config.connect_version, ProtocolVersion::from_quad([4, 1, 0, 0]));
        assert_eq!(config.keep_alive_interval, Duration::from_secs(2));
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert!(config.use_multicast);
        assert_eq!(config.filter, AssetFilter::all());
    }

    #[test]
    fn test_transport_mirrors_session_fields() {
        let config = SessionConfig::default()
            .with_local_address(Ipv4Addr::new(10, 0, 0, 5))
            .with_data_port(9000)
            .with_multicast(false)
            .with_poll_interval(Duration::from_millis(40));
        let transport = config.transport();

        assert_eq!(transport.local_address, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(transport.data_port, 9000);
        assert!(!transport.use_multicast);
        assert_eq!(transport.poll_interval, Duration::from_millis(40));
    }
}
