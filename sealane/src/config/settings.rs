//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::live_feed::WireFormat;
use crate::navigation::ThrottleShape;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// GPS source the relay connects to
    pub source: SourceSettings,
    /// Relay server settings
    pub relay: RelaySettings,
    /// Feed listener settings
    pub listener: ListenerSettings,
    /// Navigation estimator settings
    pub navigation: NavigationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// GPS source configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// Host name or address of the GPS source
    pub host: String,
    /// TCP port of the GPS source
    pub port: u16,
    /// Line format sent by the source: nmea or json
    pub format: WireFormat,
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    /// WebSocket port subscribers connect to
    pub listen_port: u16,
    /// Seconds to wait before reconnecting to the source
    pub reconnect_delay_secs: f64,
    /// Reconnection attempts before giving up
    pub max_reconnect_attempts: u32,
}

/// Feed listener configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerSettings {
    /// WebSocket URL of the relay
    pub url: String,
    /// Expected line format: nmea, json or auto
    pub format: WireFormat,
    /// Seconds without a fix before the feed is stale
    pub stale_threshold_secs: f64,
    /// Milliseconds between staleness checks
    pub check_interval_ms: u64,
    /// Seconds to wait before reconnecting to the relay
    pub reconnect_delay_secs: f64,
    /// Reconnection attempts before giving up
    pub max_reconnect_attempts: u32,
}

/// Navigation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSettings {
    /// Throttle alert shape: power or linear
    pub throttle_policy: ThrottleShape,
    /// Delay in seconds at which the throttle alert saturates
    pub throttle_threshold_secs: f64,
    /// Exponent of the power shape
    pub throttle_exponent: f64,
    /// Speed in knots at or below which the vessel counts as stopped
    pub min_moving_speed_knots: f64,
    /// Half-width of turn gates in meters
    pub crossing_extension_m: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for log files
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}
