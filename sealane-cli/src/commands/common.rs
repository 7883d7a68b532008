//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;
use sealane::geo::GeoPoint;
use sealane::live_feed::WireFormat;

/// Line format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum FormatArg {
    /// NMEA 0183 sentences (GPS2IP)
    Nmea,
    /// SensorLog JSON records
    Json,
    /// Detect per line
    Auto,
}

impl From<FormatArg> for WireFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Nmea => WireFormat::Nmea,
            FormatArg::Json => WireFormat::Json,
            FormatArg::Auto => WireFormat::Auto,
        }
    }
}

/// Parse a `LAT,LON` pair in decimal degrees.
pub fn parse_waypoint(s: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    GeoPoint::try_new(lat, lon).map_err(|e| e.to_string())
}

/// Format an optional value with a unit, or a dash when unknown.
pub fn format_optional(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", precision, v, unit),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_waypoint() {
        let point = parse_waypoint("59.3293, 18.0686").unwrap();
        assert_eq!(point, GeoPoint::new(59.3293, 18.0686));
    }

    #[test]
    fn test_parse_waypoint_rejects_bad_input() {
        assert!(parse_waypoint("59.3293").is_err());
        assert!(parse_waypoint("north,18.0").is_err());
        assert!(parse_waypoint("95.0,18.0").is_err());
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(5.26), 1, " kn"), "5.3 kn");
        assert_eq!(format_optional(None, 1, " kn"), "-");
    }

    #[test]
    fn test_format_arg_to_wire_format() {
        assert_eq!(WireFormat::from(FormatArg::Json), WireFormat::Json);
        assert_eq!(WireFormat::from(FormatArg::Auto), WireFormat::Auto);
    }
}
