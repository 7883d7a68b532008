//! Navigation estimation against a planned route.
//!
//! - [`estimator`] - delay, predicted arrival and throttle alert for a target waypoint
//! - [`throttle`] - shaping of the throttle alert
//! - [`passage`] - waypoint passage and route progress
//! - [`crossing`] - gate lines at turns and crossing detection
//!
//! Everything here is synchronous and side-effect free apart from
//! [`NavigationEstimator::estimate_from_feed`], which waits on the live feed.

pub mod crossing;
pub mod estimator;
pub mod passage;
pub mod throttle;

pub use crossing::{CrossingOutline, GateCrossing, GateEvent, DEFAULT_CROSSING_EXTENSION_M};
pub use estimator::{
    DelayResult, EstimatorConfig, NavigationError, NavigationEstimator,
    DEFAULT_MIN_MOVING_SPEED_KNOTS,
};
pub use passage::{has_passed_waypoint, RouteProgress, DEFAULT_ARRIVAL_RADIUS_NM};
pub use throttle::{
    ThrottlePolicy, ThrottleShape, UnknownThrottleShape, DEFAULT_THROTTLE_EXPONENT,
    DEFAULT_THROTTLE_THRESHOLD_SECS,
};
