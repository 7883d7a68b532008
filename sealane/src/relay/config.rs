//! Relay configuration.

use std::net::{Ipv4Addr, SocketAddr};

use crate::live_feed::WireFormat;
use crate::reconnect::ReconnectPolicy;

/// Default GPS source host (GPS2IP on the local network).
pub const DEFAULT_SOURCE_HOST: &str = "192.168.50.25";

/// Default GPS source TCP port.
pub const DEFAULT_SOURCE_PORT: u16 = 11123;

/// Default WebSocket port subscribers connect to.
pub const DEFAULT_LISTEN_PORT: u16 = 3001;

/// Frames queued per subscriber before new frames are skipped for it.
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 32;

/// Configuration for the [`Relay`](super::Relay).
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// GPS source host name or address.
    pub source_host: String,

    /// GPS source TCP port.
    pub source_port: u16,

    /// Address the WebSocket listener binds to.
    pub listen_addr: SocketAddr,

    /// Line format sent by the source.
    pub format: WireFormat,

    /// Retry behaviour towards the source.
    pub reconnect: ReconnectPolicy,

    /// Per-subscriber queue capacity.
    pub subscriber_queue: usize,
}

impl RelayConfig {
    /// `host:port` of the GPS source.
    pub fn source_address(&self) -> String {
        format!("{}:{}", self.source_host, self.source_port)
    }

    pub fn with_source(mut self, host: impl Into<String>, port: u16) -> Self {
        self.source_host = host.into();
        self.source_port = port;
        self
    }

    /// Listen on all interfaces at `port`.
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source_host: DEFAULT_SOURCE_HOST.to_string(),
            source_port: DEFAULT_SOURCE_PORT,
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LISTEN_PORT)),
            format: WireFormat::Nmea,
            reconnect: ReconnectPolicy::default(),
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.source_address(), "192.168.50.25:11123");
        assert_eq!(config.listen_addr.port(), 3001);
        assert_eq!(config.format, WireFormat::Nmea);
        assert_eq!(config.reconnect.max_attempts, 3);
    }

    #[test]
    fn test_builders() {
        let config = RelayConfig::default()
            .with_source("10.0.0.2", 5000)
            .with_listen_port(9000);
        assert_eq!(config.source_address(), "10.0.0.2:5000");
        assert_eq!(config.listen_addr.port(), 9000);
    }
}
