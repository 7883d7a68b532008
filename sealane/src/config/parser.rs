//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("host") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("source", "host", v, "must not be empty"));
            }
            config.source.host = v.to_string();
        }
        if let Some(v) = section.get("port") {
            config.source.port = parse_value("source", "port", v, "must be a port number")?;
        }
        if let Some(v) = section.get("format") {
            config.source.format =
                parse_value("source", "format", v, "must be one of: nmea, json, auto")?;
        }
    }

    // [relay] section
    if let Some(section) = ini.section(Some("relay")) {
        if let Some(v) = section.get("listen_port") {
            config.relay.listen_port =
                parse_value("relay", "listen_port", v, "must be a port number")?;
        }
        if let Some(v) = section.get("reconnect_delay_secs") {
            config.relay.reconnect_delay_secs =
                parse_duration_secs("relay", "reconnect_delay_secs", v)?;
        }
        if let Some(v) = section.get("max_reconnect_attempts") {
            config.relay.max_reconnect_attempts = parse_value(
                "relay",
                "max_reconnect_attempts",
                v,
                "must be a non-negative integer",
            )?;
        }
    }

    // [listener] section
    if let Some(section) = ini.section(Some("listener")) {
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if !(v.starts_with("ws://") || v.starts_with("wss://")) {
                return Err(invalid(
                    "listener",
                    "url",
                    v,
                    "must start with ws:// or wss://",
                ));
            }
            config.listener.url = v.to_string();
        }
        if let Some(v) = section.get("format") {
            config.listener.format =
                parse_value("listener", "format", v, "must be one of: nmea, json, auto")?;
        }
        if let Some(v) = section.get("stale_threshold_secs") {
            let secs = parse_duration_secs("listener", "stale_threshold_secs", v)?;
            if secs == 0.0 {
                return Err(invalid(
                    "listener",
                    "stale_threshold_secs",
                    v,
                    "must be greater than zero",
                ));
            }
            config.listener.stale_threshold_secs = secs;
        }
        if let Some(v) = section.get("check_interval_ms") {
            let ms: u64 = parse_value(
                "listener",
                "check_interval_ms",
                v,
                "must be a positive integer (milliseconds)",
            )?;
            if ms == 0 {
                return Err(invalid(
                    "listener",
                    "check_interval_ms",
                    v,
                    "must be a positive integer (milliseconds)",
                ));
            }
            config.listener.check_interval_ms = ms;
        }
        if let Some(v) = section.get("reconnect_delay_secs") {
            config.listener.reconnect_delay_secs =
                parse_duration_secs("listener", "reconnect_delay_secs", v)?;
        }
        if let Some(v) = section.get("max_reconnect_attempts") {
            config.listener.max_reconnect_attempts = parse_value(
                "listener",
                "max_reconnect_attempts",
                v,
                "must be a non-negative integer",
            )?;
        }
    }

    // [navigation] section
    if let Some(section) = ini.section(Some("navigation")) {
        if let Some(v) = section.get("throttle_policy") {
            config.navigation.throttle_policy = parse_value(
                "navigation",
                "throttle_policy",
                v,
                "must be one of: power, linear",
            )?;
        }
        if let Some(v) = section.get("throttle_threshold_secs") {
            let secs = parse_non_negative("navigation", "throttle_threshold_secs", v)?;
            if secs == 0.0 {
                return Err(invalid(
                    "navigation",
                    "throttle_threshold_secs",
                    v,
                    "must be greater than zero",
                ));
            }
            config.navigation.throttle_threshold_secs = secs;
        }
        if let Some(v) = section.get("throttle_exponent") {
            let exponent = parse_non_negative("navigation", "throttle_exponent", v)?;
            if exponent == 0.0 {
                return Err(invalid(
                    "navigation",
                    "throttle_exponent",
                    v,
                    "must be greater than zero",
                ));
            }
            config.navigation.throttle_exponent = exponent;
        }
        if let Some(v) = section.get("min_moving_speed_knots") {
            config.navigation.min_moving_speed_knots =
                parse_non_negative("navigation", "min_moving_speed_knots", v)?;
        }
        if let Some(v) = section.get("crossing_extension_m") {
            config.navigation.crossing_extension_m =
                parse_non_negative("navigation", "crossing_extension_m", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Parse a finite, non-negative number.
fn parse_non_negative(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let reason = "must be a non-negative number";
    let parsed: f64 = parse_value(section, key, value, reason)?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

/// Parse a number of seconds that must fit in a `Duration`.
fn parse_duration_secs(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let secs = parse_non_negative(section, key, value)?;
    if Duration::try_from_secs_f64(secs).is_err() {
        return Err(invalid(section, key, value, "is too large for a duration"));
    }
    Ok(secs)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
