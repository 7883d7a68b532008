//! Core state types for the live position feed.
//!
//! - [`Position`] - One decoded GPS fix
//! - [`ConnectionPhase`] - Where the listener is in its connection lifecycle
//! - [`FeedSnapshot`] - Latest fix, its arrival time and the phase, published together
//! - [`FeedEvent`] - Notifications broadcast by the listener

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::geo::{CoordError, GeoPoint};

/// A decoded GPS fix.
///
/// Only latitude and longitude are guaranteed. Every reported field is `None`
/// when the source record did not carry it; an absent speed is never zero.
/// Motion estimated from earlier fixes lives in the `derived_*` fields and
/// never overwrites a reported value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,

    /// Speed over ground in knots.
    pub speed_knots: Option<f64>,

    /// Course over ground in degrees true, [0, 360).
    pub course_deg: Option<f64>,

    /// Device heading in degrees true, [0, 360).
    pub heading_deg: Option<f64>,

    /// Altitude above sea level in meters.
    pub altitude_meters: Option<f64>,

    /// Identifier reported by the sending device.
    pub device_id: Option<String>,

    /// Battery level of the sending device, 0-100.
    pub battery_percent: Option<f64>,

    /// Timestamp string as reported by the source, not interpreted.
    pub source_timestamp: Option<String>,

    /// Speed over ground estimated from recent fixes, in knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_speed_knots: Option<f64>,

    /// Course over ground estimated from recent fixes, in degrees true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_course_deg: Option<f64>,
}

impl Position {
    /// Create a position with only coordinates set.
    ///
    /// Fails when either coordinate is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        GeoPoint::try_new(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
            speed_knots: None,
            course_deg: None,
            heading_deg: None,
            altitude_meters: None,
            device_id: None,
            battery_percent: None,
            source_timestamp: None,
            derived_speed_knots: None,
            derived_course_deg: None,
        })
    }

    pub fn with_speed_knots(mut self, speed_knots: f64) -> Self {
        self.speed_knots = Some(speed_knots);
        self
    }

    pub fn with_course_deg(mut self, course_deg: f64) -> Self {
        self.course_deg = Some(course_deg);
        self
    }

    /// Reported speed, falling back to the derived one.
    pub fn speed_over_ground(&self) -> Option<f64> {
        self.speed_knots.or(self.derived_speed_knots)
    }

    /// Reported course, falling back to the derived one.
    pub fn course_over_ground(&self) -> Option<f64> {
        self.course_deg.or(self.derived_course_deg)
    }

    /// The fix as a plain coordinate.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Connection lifecycle of the feed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionPhase {
    /// No connection and no attempt in flight.
    #[default]
    Disconnected,
    /// Socket opening, or open but no record parsed yet.
    Connecting,
    /// At least one record parsed on the current connection.
    Connected,
    /// Records stopped arriving; the connection is being dropped.
    Stale,
}

impl ConnectionPhase {
    /// True while a connection is open or being opened.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Stale => write!(f, "Stale"),
        }
    }
}

/// Everything a reader needs about the feed, replaced as one value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    /// Most recent fix, if any has ever arrived.
    pub latest_position: Option<Position>,

    /// When `latest_position` was stored.
    pub last_update: Option<Instant>,

    /// Listener phase at the time of the snapshot.
    pub phase: ConnectionPhase,
}

impl FeedSnapshot {
    /// Age of the latest fix at `now`, `None` if nothing has arrived.
    pub fn age_at(&self, now: Instant) -> Option<Duration> {
        self.last_update
            .map(|updated| now.saturating_duration_since(updated))
    }

    /// True if the latest fix is at most `threshold` old at `now`.
    ///
    /// Compared at millisecond resolution. Always false before the first fix.
    pub fn is_fresh_at(&self, now: Instant, threshold: Duration) -> bool {
        match self.age_at(now) {
            Some(age) => age.as_millis() <= threshold.as_millis(),
            None => false,
        }
    }
}

/// Kind of failure reported through [`FeedEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// Connecting failed or the socket errored.
    Connection,
    /// No record arrived within the stale threshold.
    Stale,
    /// A received line could not be decoded.
    Parse,
}

impl std::fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Stale => write!(f, "stale"),
            Self::Parse => write!(f, "parse"),
        }
    }
}

/// Notification published by the feed listener.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// First record parsed on a new connection.
    Connected,
    /// A new fix was stored.
    PositionUpdated(Position),
    /// A connection that had delivered data went away.
    Disconnected,
    /// Something went wrong; see the kind.
    Error(FeedErrorKind),
}
