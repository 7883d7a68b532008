//! Wire protocol parsing for GPS feed lines.
//!
//! Supports two line formats:
//! - **NMEA RMC** - `$xxRMC` sentences from a GPS receiver or GPS2IP
//! - **SensorLog JSON** - one JSON object per line from the SensorLog app
//!
//! Both arrive newline framed; [`line_frames`] turns a byte stream into trimmed,
//! non-empty lines.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tracing::trace;

use super::state::Position;
use crate::geo::{normalize_degrees, CoordError};

/// Conversion factor: meters per second to knots.
pub const MS_TO_KNOTS: f64 = 1.943844;

/// Longest line accepted from a feed; longer lines are discarded.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Line format carried by a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// NMEA 0183 sentences, only RMC is decoded.
    #[default]
    Nmea,
    /// SensorLog JSON objects.
    Json,
    /// Detect per line: `$` means NMEA, `{` means JSON.
    Auto,
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nmea => write!(f, "nmea"),
            Self::Json => write!(f, "json"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Returned when a wire format name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown wire format '{0}' (expected nmea, json or auto)")]
pub struct UnknownWireFormat(pub String);

impl FromStr for WireFormat {
    type Err = UnknownWireFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nmea" => Ok(Self::Nmea),
            "json" => Ok(Self::Json),
            "auto" => Ok(Self::Auto),
            _ => Err(UnknownWireFormat(s.to_string())),
        }
    }
}

/// Why a feed line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("line is neither NMEA nor JSON")]
    UnrecognizedFormat,

    #[error("not an RMC sentence: {0}")]
    NotRmc(String),

    #[error("NMEA checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    Checksum { expected: u8, computed: u8 },

    #[error("receiver reports no valid fix")]
    NoFix,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid value '{value}' for {field}")]
    InvalidField { field: &'static str, value: String },

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("coordinate out of range: {0}")]
    Coordinate(#[from] CoordError),
}

impl ParseError {
    /// True for lines a healthy feed routinely sends and that carry no fix,
    /// such as other NMEA sentences or a receiver without a lock.
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::Empty | Self::NotRmc(_) | Self::NoFix)
    }
}

/// Parse one feed line in the given format.
pub fn parse_line(line: &str, format: WireFormat) -> Result<Position, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    match format {
        WireFormat::Nmea => parse_nmea_rmc(line),
        WireFormat::Json => parse_sensorlog_json(line),
        WireFormat::Auto => match line.as_bytes()[0] {
            b'$' => parse_nmea_rmc(line),
            b'{' => parse_sensorlog_json(line),
            _ => Err(ParseError::UnrecognizedFormat),
        },
    }
}

/// Parse an NMEA RMC sentence.
///
/// Format: `$xxRMC,hhmmss.ss,A,ddmm.mmmm,N,dddmm.mmmm,E,knots,course,ddmmyy,...*hh`
///
/// Any talker id is accepted. The checksum is verified when present. Only
/// status `A` (valid fix) yields a position.
pub fn parse_nmea_rmc(line: &str) -> Result<Position, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let body = line.strip_prefix('$').ok_or(ParseError::UnrecognizedFormat)?;

    let body = match body.split_once('*') {
        Some((body, checksum)) => {
            verify_checksum(body, checksum)?;
            body
        }
        None => body,
    };

    let fields: Vec<&str> = body.split(',').collect();
    let sentence = fields[0];
    if sentence.len() != 5 || !sentence.ends_with("RMC") {
        return Err(ParseError::NotRmc(sentence.to_string()));
    }

    if required(&fields, 2, "status")? != "A" {
        return Err(ParseError::NoFix);
    }

    let latitude = parse_nmea_angle(
        required(&fields, 3, "latitude")?,
        required(&fields, 4, "latitude hemisphere")?,
        ("N", "S"),
        "latitude",
    )?;
    let longitude = parse_nmea_angle(
        required(&fields, 5, "longitude")?,
        required(&fields, 6, "longitude hemisphere")?,
        ("E", "W"),
        "longitude",
    )?;

    let mut position = Position::new(latitude, longitude)?;
    position.speed_knots = optional_number(&fields, 7, "speed")?;
    position.course_deg = optional_number(&fields, 8, "course")?.map(normalize_degrees);
    position.source_timestamp = optional(&fields, 1).map(str::to_string);

    if position.speed_knots.is_some_and(|speed| speed < 0.0) {
        return Err(ParseError::InvalidField {
            field: "speed",
            value: fields[7].to_string(),
        });
    }

    Ok(position)
}

/// XOR of all bytes between `$` and `*`.
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

fn verify_checksum(body: &str, checksum: &str) -> Result<(), ParseError> {
    let checksum = checksum.trim();
    let expected = u8::from_str_radix(checksum, 16).map_err(|_| ParseError::InvalidField {
        field: "checksum",
        value: checksum.to_string(),
    })?;
    let computed = nmea_checksum(body);
    if expected != computed {
        return Err(ParseError::Checksum { expected, computed });
    }
    Ok(())
}

fn optional<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).copied().filter(|field| !field.is_empty())
}

fn required<'a>(
    fields: &[&'a str],
    index: usize,
    name: &'static str,
) -> Result<&'a str, ParseError> {
    optional(fields, index).ok_or(ParseError::MissingField(name))
}

fn optional_number(
    fields: &[&str],
    index: usize,
    name: &'static str,
) -> Result<Option<f64>, ParseError> {
    optional(fields, index)
        .map(|raw| parse_number(raw, name))
        .transpose()
}

fn parse_number(raw: &str, name: &'static str) -> Result<f64, ParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::InvalidField {
            field: name,
            value: raw.to_string(),
        })
}

/// Decode `DDMM.MMMM` (or `DDDMM.MMMM`) plus hemisphere into signed degrees.
fn parse_nmea_angle(
    raw: &str,
    hemisphere: &str,
    (positive, negative): (&str, &str),
    name: &'static str,
) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidField {
        field: name,
        value: raw.to_string(),
    };

    let value = parse_number(raw, name)?;
    if value < 0.0 {
        return Err(invalid());
    }
    let degrees = (value / 100.0).trunc();
    let minutes = value - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(invalid());
    }
    let angle = degrees + minutes / 60.0;

    if hemisphere == positive {
        Ok(angle)
    } else if hemisphere == negative {
        Ok(-angle)
    } else {
        Err(ParseError::InvalidField {
            field: name,
            value: hemisphere.to_string(),
        })
    }
}

/// One SensorLog record. Numeric fields may be sent as numbers or strings.
#[derive(Debug, Deserialize)]
struct SensorLogRecord {
    #[serde(rename = "deviceID", default, deserialize_with = "text_or_number")]
    device_id: Option<String>,

    #[serde(
        rename = "locationTimestamp_since1970",
        default,
        deserialize_with = "text_or_number"
    )]
    timestamp: Option<String>,

    #[serde(rename = "locationLatitude", default, deserialize_with = "number_or_text")]
    latitude: Option<f64>,

    #[serde(rename = "locationLongitude", default, deserialize_with = "number_or_text")]
    longitude: Option<f64>,

    /// Meters per second, negative when unknown.
    #[serde(rename = "locationSpeed", default, deserialize_with = "number_or_text")]
    speed: Option<f64>,

    #[serde(rename = "locationCourse", default, deserialize_with = "number_or_text")]
    course: Option<f64>,

    #[serde(rename = "locationTrueHeading", default, deserialize_with = "number_or_text")]
    true_heading: Option<f64>,

    #[serde(rename = "locationAltitude", default, deserialize_with = "number_or_text")]
    altitude: Option<f64>,

    /// Fraction 0-1, negative when unknown.
    #[serde(rename = "batteryLevel", default, deserialize_with = "number_or_text")]
    battery_level: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Number(serde_json::Number),
}

fn number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Number(value)) => Ok(Some(value)),
        Some(RawNumber::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawNumber::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not a number: '{}'", text))),
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<RawText>::deserialize(deserializer)? {
        None => None,
        Some(RawText::Text(text)) if text.is_empty() => None,
        Some(RawText::Text(text)) => Some(text),
        Some(RawText::Number(number)) => Some(number.to_string()),
    })
}

/// Parse a SensorLog JSON line.
///
/// Speed is converted from m/s to knots and battery from a fraction to a
/// percentage. Negative speed, course, heading or battery mean "unknown".
pub fn parse_sensorlog_json(line: &str) -> Result<Position, ParseError> {
    let record: SensorLogRecord =
        serde_json::from_str(line.trim()).map_err(|e| ParseError::Json(e.to_string()))?;

    let latitude = record
        .latitude
        .ok_or(ParseError::MissingField("locationLatitude"))?;
    let longitude = record
        .longitude
        .ok_or(ParseError::MissingField("locationLongitude"))?;

    let known = |value: Option<f64>| value.filter(|v| v.is_finite() && *v >= 0.0);

    let mut position = Position::new(latitude, longitude)?;
    position.speed_knots = known(record.speed).map(|ms| ms * MS_TO_KNOTS);
    position.course_deg = known(record.course).map(normalize_degrees);
    position.heading_deg = known(record.true_heading).map(normalize_degrees);
    position.altitude_meters = record.altitude.filter(|v| v.is_finite());
    position.battery_percent = known(record.battery_level).map(|level| level * 100.0);
    position.device_id = record.device_id;
    position.source_timestamp = record.timestamp;

    Ok(position)
}

/// Newline framing for feed streams.
///
/// Wraps [`LinesCodec`] so that frames are trimmed, blank lines are skipped and
/// lines longer than [`MAX_LINE_LENGTH`] are discarded instead of ending the
/// stream.
#[derive(Debug, Clone)]
pub struct FeedLineCodec {
    lines: LinesCodec,
}

impl FeedLineCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }

    fn accept(
        result: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Option<String>>, std::io::Error> {
        match result {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    Ok(Some(None))
                } else {
                    Ok(Some(Some(trimmed.to_string())))
                }
            }
            Ok(None) => Ok(None),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                trace!(max = MAX_LINE_LENGTH, "Dropped oversized feed line");
                Ok(Some(None))
            }
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                // LinesCodec has already consumed the undecodable line.
                trace!(error = %e, "Dropped feed line that is not valid UTF-8");
                Ok(Some(None))
            }
            Err(LinesCodecError::Io(e)) => Err(e),
        }
    }
}

impl Default for FeedLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FeedLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        loop {
            match Self::accept(self.lines.decode(buf))? {
                Some(Some(line)) => return Ok(Some(line)),
                Some(None) => continue,
                None => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        loop {
            match Self::accept(self.lines.decode_eof(buf))? {
                Some(Some(line)) => return Ok(Some(line)),
                Some(None) => continue,
                None => return Ok(None),
            }
        }
    }
}

/// Split a byte stream into trimmed, non-empty lines.
pub fn line_frames<R: AsyncRead>(reader: R) -> FramedRead<R, FeedLineCodec> {
    FramedRead::new(reader, FeedLineCodec::new())
}
