//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[source]
; GPS source the relay connects to (GPS2IP, SensorLog or any NMEA over TCP server)
host = {}
port = {}
; Line format sent by the source:
;   nmea - NMEA 0183 sentences, only RMC is decoded
;   json - SensorLog JSON records, other lines are dropped
;   auto - detect per line
format = {}

[relay]
; WebSocket port subscribers connect to
listen_port = {}
; Seconds to wait between source reconnection attempts
reconnect_delay_secs = {}
; Reconnection attempts before the relay gives up (0 disables reconnection)
max_reconnect_attempts = {}

[listener]
; WebSocket URL of the relay
url = {}
; Expected line format: nmea, json or auto
format = {}
; Seconds without a fix before the feed is considered stale
stale_threshold_secs = {}
; Milliseconds between staleness checks
check_interval_ms = {}
; Seconds to wait between reconnection attempts
reconnect_delay_secs = {}
; Reconnection attempts before the listener gives up (0 disables reconnection)
max_reconnect_attempts = {}

[navigation]
; Throttle alert shape:
;   power  - sign(delay) * (min(|delay|, threshold) / threshold) ^ exponent
;   linear - sign(delay) * min(|delay|, threshold) / threshold
throttle_policy = {}
; Delay in seconds at which the throttle alert saturates
throttle_threshold_secs = {}
; Exponent of the power shape
throttle_exponent = {}
; Speed in knots at or below which the vessel is treated as stopped
min_moving_speed_knots = {}
; Half-width in meters of the gate line drawn at each turn
crossing_extension_m = {}

[logging]
; Directory for log files
directory = {}
; Log file name
file = {}
"#,
        config.source.host,
        config.source.port,
        config.source.format,
        config.relay.listen_port,
        config.relay.reconnect_delay_secs,
        config.relay.max_reconnect_attempts,
        config.listener.url,
        config.listener.format,
        config.listener.stale_threshold_secs,
        config.listener.check_interval_ms,
        config.listener.reconnect_delay_secs,
        config.listener.max_reconnect_attempts,
        config.navigation.throttle_policy,
        config.navigation.throttle_threshold_secs,
        config.navigation.throttle_exponent,
        config.navigation.min_moving_speed_knots,
        config.navigation.crossing_extension_m,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
