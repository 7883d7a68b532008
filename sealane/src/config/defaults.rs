//! Default values for all configuration settings and the
//! `ConfigFile::default()` implementation.

use super::file::config_directory;
use super::settings::*;
use crate::live_feed::{WireFormat, DEFAULT_FEED_URL};
use crate::navigation::{
    ThrottleShape, DEFAULT_CROSSING_EXTENSION_M, DEFAULT_MIN_MOVING_SPEED_KNOTS,
    DEFAULT_THROTTLE_EXPONENT, DEFAULT_THROTTLE_THRESHOLD_SECS,
};
use crate::relay::{DEFAULT_LISTEN_PORT, DEFAULT_SOURCE_HOST, DEFAULT_SOURCE_PORT};

// =============================================================================
// Connection defaults
// =============================================================================

/// Default seconds between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY_SECS: f64 = 5.0;

/// Default reconnection attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Default seconds without a fix before the feed is stale.
pub const DEFAULT_STALE_THRESHOLD_SECS: f64 = 5.0;

/// Default milliseconds between staleness checks.
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 1000;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "sealane.log";

/// Default log directory name under the config directory.
pub const DEFAULT_LOG_DIR_NAME: &str = "logs";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source: SourceSettings {
                host: DEFAULT_SOURCE_HOST.to_string(),
                port: DEFAULT_SOURCE_PORT,
                format: WireFormat::Nmea,
            },
            relay: RelaySettings {
                listen_port: DEFAULT_LISTEN_PORT,
                reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
                max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            },
            listener: ListenerSettings {
                url: DEFAULT_FEED_URL.to_string(),
                format: WireFormat::Nmea,
                stale_threshold_secs: DEFAULT_STALE_THRESHOLD_SECS,
                check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
                reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
                max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            },
            navigation: NavigationSettings {
                throttle_policy: ThrottleShape::Power,
                throttle_threshold_secs: DEFAULT_THROTTLE_THRESHOLD_SECS,
                throttle_exponent: DEFAULT_THROTTLE_EXPONENT,
                min_moving_speed_knots: DEFAULT_MIN_MOVING_SPEED_KNOTS,
                crossing_extension_m: DEFAULT_CROSSING_EXTENSION_M,
            },
            logging: LoggingSettings {
                directory: config_directory().join(DEFAULT_LOG_DIR_NAME),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
