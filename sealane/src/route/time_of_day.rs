//! Wall-clock time of day with 24-hour wraparound.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A clock time split into hour, minute, second and millisecond fields.
///
/// Planned arrivals and formatted delays are both expressed with this type.
/// Conversions from seconds wrap around midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl TimeOfDay {
    /// Midnight (00:00:00.000).
    pub const MIDNIGHT: Self = Self {
        hour: 0,
        minute: 0,
        second: 0,
        millisecond: 0,
    };

    /// Create from fields, returning `None` if any field is out of range.
    pub fn from_hms_milli(hour: u8, minute: u8, second: u8, millisecond: u16) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 && millisecond < 1000 {
            Some(Self {
                hour,
                minute,
                second,
                millisecond,
            })
        } else {
            None
        }
    }

    /// Seconds since midnight, including the fractional milliseconds.
    pub fn as_seconds(&self) -> f64 {
        self.hour as f64 * 3600.0
            + self.minute as f64 * 60.0
            + self.second as f64
            + self.millisecond as f64 / 1000.0
    }

    /// Format a number of seconds as a time of day.
    ///
    /// The value is rounded to the nearest millisecond and wrapped into a
    /// single day, so 25 hours becomes 01:00:00.000 and negative values count
    /// back from midnight.
    pub fn from_seconds(seconds: f64) -> Self {
        let total_ms = (seconds * 1000.0).round() as i64;
        let ms = total_ms.rem_euclid(MILLIS_PER_DAY);

        Self {
            hour: (ms / 3_600_000) as u8,
            minute: (ms / 60_000 % 60) as u8,
            second: (ms / 1000 % 60) as u8,
            millisecond: (ms % 1000) as u16,
        }
    }

    /// The current local wall-clock time.
    pub fn now() -> Self {
        chrono::Local::now().time().into()
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
            // Leap seconds report nanoseconds past 1e9
            millisecond: (time.nanosecond() / 1_000_000).min(999) as u16,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour, self.minute, self.second, self.millisecond
        )
    }
}

/// Returned when a string is not a `HH:MM[:SS[.mmm]]` time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day '{0}' (expected HH:MM, HH:MM:SS or HH:MM:SS.mmm)")]
pub struct ParseTimeOfDayError(String);

impl FromStr for TimeOfDay {
    type Err = ParseTimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
            .map(Self::from)
            .ok_or_else(|| ParseTimeOfDayError(s.to_string()))
    }
}
