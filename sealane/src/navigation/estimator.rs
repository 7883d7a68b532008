//! Schedule delay and throttle estimation against a planned ETA table.

use thiserror::Error;

use super::throttle::ThrottlePolicy;
use crate::geo::{distance_nm, GeoPoint};
use crate::live_feed::{FeedError, LiveFeedStore, Position};
use crate::route::{EtaTable, TimeOfDay, SECONDS_PER_DAY};

/// Below this speed the vessel is treated as not moving (knots).
pub const DEFAULT_MIN_MOVING_SPEED_KNOTS: f64 = 0.1;

/// Delays smaller than this are reported as exactly zero (seconds).
pub const DELAY_EPSILON_SECS: f64 = 1e-6;

const HALF_DAY_SECS: f64 = SECONDS_PER_DAY / 2.0;

/// Errors from the navigation estimator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("waypoint index {index} is out of range for a route of {len} waypoints")]
    WaypointOutOfRange { index: usize, len: usize },

    #[error("no position has been received yet")]
    NoPosition,

    #[error("feed disconnected before a position arrived")]
    FeedDisconnected,
}

impl From<FeedError> for NavigationError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::NoPosition => Self::NoPosition,
            FeedError::Disconnected => Self::FeedDisconnected,
        }
    }
}

/// Estimator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Delay to alert mapping.
    pub throttle: ThrottlePolicy,

    /// Speeds at or below this give no predicted arrival.
    pub min_moving_speed_knots: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottlePolicy::default(),
            min_moving_speed_knots: DEFAULT_MIN_MOVING_SPEED_KNOTS,
        }
    }
}

/// Outcome of one delay estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayResult {
    /// Great-circle distance to the target waypoint.
    pub remaining_distance_nm: f64,

    /// Predicted arrival at current speed; `None` when not moving.
    pub predicted_arrival: Option<TimeOfDay>,

    /// Predicted minus planned arrival. Positive means late.
    pub raw_delay_seconds: f64,

    /// `|raw_delay_seconds|` as a clock value.
    pub formatted_delay: TimeOfDay,

    pub is_late: bool,

    /// Correction signal in [-1, +1], positive when late.
    pub throttle_alert: f64,
}

impl DelayResult {
    /// False when the vessel is not moving and no arrival can be predicted.
    pub fn is_reachable(&self) -> bool {
        self.predicted_arrival.is_some()
    }
}

/// Computes delay and throttle for a target waypoint.
#[derive(Debug, Clone, Default)]
pub struct NavigationEstimator {
    config: EstimatorConfig,
}

impl NavigationEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate the delay to `target` from an explicit position and speed.
    ///
    /// `now` is the current local time of day. Planned and predicted
    /// arrivals are compared on the planned day nearest to `now`, so a plan
    /// spanning midnight yields a delay of minutes rather than a day.
    pub fn estimate_delay(
        &self,
        eta: &EtaTable,
        target: usize,
        position: GeoPoint,
        speed_knots: f64,
        now: TimeOfDay,
    ) -> Result<DelayResult, NavigationError> {
        let entry = eta.get(target).ok_or(NavigationError::WaypointOutOfRange {
            index: target,
            len: eta.len(),
        })?;

        let remaining_distance_nm = distance_nm(position, entry.waypoint);
        let moving = speed_knots.is_finite() && speed_knots > self.config.min_moving_speed_knots;

        let (predicted_arrival, raw_delay_seconds) = if moving {
            let now_secs = now.as_seconds();
            let travel_secs = remaining_distance_nm / speed_knots * 3600.0;
            let planned_offset = nearest_offset(entry.planned_arrival.as_seconds() - now_secs);
            let raw = snap_delay(travel_secs - planned_offset);
            (Some(TimeOfDay::from_seconds(now_secs + travel_secs)), raw)
        } else {
            (None, 0.0)
        };

        let result = DelayResult {
            remaining_distance_nm,
            predicted_arrival,
            raw_delay_seconds,
            formatted_delay: TimeOfDay::from_seconds(raw_delay_seconds.abs()),
            is_late: raw_delay_seconds > 0.0,
            throttle_alert: self.config.throttle.alert(raw_delay_seconds),
        };

        tracing::trace!(
            waypoint = target,
            remaining_nm = result.remaining_distance_nm,
            raw_delay_secs = result.raw_delay_seconds,
            throttle = result.throttle_alert,
            "Delay estimated"
        );

        Ok(result)
    }

    /// Estimate from a fix.
    ///
    /// Uses the reported speed, else the speed derived from recent fixes.
    /// With neither, the vessel is treated as not moving.
    pub fn estimate_from_position(
        &self,
        eta: &EtaTable,
        target: usize,
        position: &Position,
        now: TimeOfDay,
    ) -> Result<DelayResult, NavigationError> {
        self.estimate_delay(
            eta,
            target,
            position.point(),
            position.speed_over_ground().unwrap_or(0.0),
            now,
        )
    }

    /// Estimate from the live feed, waiting for the first fix if needed.
    pub async fn estimate_from_feed(
        &self,
        store: &LiveFeedStore,
        eta: &EtaTable,
        target: usize,
        now: TimeOfDay,
    ) -> Result<DelayResult, NavigationError> {
        let position = store.wait_for_position().await?;
        self.estimate_from_position(eta, target, &position, now)
    }

    /// Estimate from the live feed without waiting.
    ///
    /// Fails with [`NavigationError::NoPosition`] before the first fix.
    pub fn try_estimate_from_feed(
        &self,
        store: &LiveFeedStore,
        eta: &EtaTable,
        target: usize,
        now: TimeOfDay,
    ) -> Result<DelayResult, NavigationError> {
        let position = store.require_position()?;
        self.estimate_from_position(eta, target, &position, now)
    }
}

/// Shift a time difference into [-12h, +12h).
fn nearest_offset(diff_secs: f64) -> f64 {
    (diff_secs + HALF_DAY_SECS).rem_euclid(SECONDS_PER_DAY) - HALF_DAY_SECS
}

fn snap_delay(raw_secs: f64) -> f64 {
    if raw_secs.abs() < DELAY_EPSILON_SECS {
        0.0
    } else {
        raw_secs
    }
}
