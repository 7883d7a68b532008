//! Recent fix history for deriving speed and course.
//!
//! NMEA RMC and SensorLog records may omit speed or course. When they do,
//! the listener estimates them from the last few fixes, the way a chart
//! plotter derives speed over ground from successive positions. Estimates go
//! into the `derived_*` fields of [`Position`]; reported fields stay as parsed.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use super::state::Position;
use crate::geo::{bearing_deg, distance_nm, GeoPoint};

/// Fixes older than this relative to the newest are forgotten.
pub const DEFAULT_TRACK_WINDOW: Duration = Duration::from_secs(10);

/// Upper bound on retained fixes.
const MAX_SAMPLES: usize = 64;

/// Minimum span between oldest and newest fix before speed is derived.
const MIN_ELAPSED: Duration = Duration::from_secs(1);

/// Movement below this (about 9 m) is treated as GPS jitter for course.
const MIN_COURSE_DISTANCE_NM: f64 = 0.005;

#[derive(Debug, Clone)]
struct Sample {
    point: GeoPoint,
    at: Instant,
}

/// Sliding window of recent fixes.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    samples: VecDeque<Sample>,
    window: Duration,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_TRACK_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
        }
    }

    /// Add a fix and drop those that fell out of the window.
    pub fn record(&mut self, point: GeoPoint, at: Instant) {
        if self.samples.back().is_some_and(|last| at < last.at) {
            // Clock went backwards; restart the window.
            self.samples.clear();
        }
        self.samples.push_back(Sample { point, at });

        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
        while let Some(oldest) = self.samples.front() {
            if at.duration_since(oldest.at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Speed over ground across the window, in knots.
    pub fn derived_speed_knots(&self) -> Option<f64> {
        let (oldest, newest) = self.span()?;
        let elapsed = newest.at.duration_since(oldest.at);
        if elapsed < MIN_ELAPSED {
            return None;
        }
        let hours = elapsed.as_secs_f64() / 3600.0;
        Some(distance_nm(oldest.point, newest.point) / hours)
    }

    /// Course over ground across the window, in degrees true.
    pub fn derived_course_deg(&self) -> Option<f64> {
        let (oldest, newest) = self.span()?;
        if distance_nm(oldest.point, newest.point) < MIN_COURSE_DISTANCE_NM {
            return None;
        }
        Some(bearing_deg(oldest.point, newest.point))
    }

    /// Record `position` and estimate the speed or course it does not carry.
    pub fn enrich(&mut self, position: &mut Position, at: Instant) {
        self.record(position.point(), at);

        if position.speed_knots.is_none() {
            position.derived_speed_knots = self.derived_speed_knots();
        }
        if position.course_deg.is_none() {
            position.derived_course_deg = self.derived_course_deg();
        }
    }

    fn span(&self) -> Option<(&Sample, &Sample)> {
        if self.samples.len() < 2 {
            return None;
        }
        Some((self.samples.front()?, self.samples.back()?))
    }
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new()
    }
}
