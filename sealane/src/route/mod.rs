//! Route Model
//!
//! An ordered list of waypoints loaded once per planning session, and the
//! planned ETA table derived from it.
//!
//! # Example
//!
//! ```
//! use sealane::route::{EtaTable, Route, TimeOfDay};
//!
//! let route = Route::new([(59.0, 18.0), (59.0, 18.0), (59.1, 18.1)]).unwrap();
//! assert_eq!(route.len(), 2); // consecutive duplicate dropped
//!
//! let start = TimeOfDay::from_hms_milli(12, 0, 0, 0).unwrap();
//! let eta = EtaTable::build(&route, start, 5.0).unwrap();
//! assert_eq!(eta.planned_arrival(0), Some(start));
//! ```

mod eta;
mod time_of_day;

pub use eta::{EtaEntry, EtaTable};
pub use time_of_day::{ParseTimeOfDayError, TimeOfDay, SECONDS_PER_DAY};

use thiserror::Error;

use crate::geo::{distance_nm, CoordError, GeoPoint};

/// A route waypoint.
pub type Waypoint = GeoPoint;

/// Errors raised while building a route or its ETA table.
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    /// No waypoints remained after dropping consecutive duplicates.
    #[error("Route has no waypoints")]
    EmptyRoute,

    /// A waypoint lies outside the valid coordinate range.
    #[error("Invalid waypoint #{index}: {source}")]
    InvalidWaypoint {
        index: usize,
        #[source]
        source: CoordError,
    },

    /// Planned speed must be positive for a route with more than one point.
    #[error("Invalid planned speed: {0} kn (must be greater than zero)")]
    InvalidSpeed(f64),
}

/// Ordered, non-empty sequence of waypoints.
///
/// No two consecutive waypoints are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    /// Build a route, dropping any waypoint equal to its immediate predecessor.
    pub fn new<I, P>(raw_waypoints: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Waypoint>,
    {
        let mut waypoints: Vec<Waypoint> = Vec::new();

        for (index, raw) in raw_waypoints.into_iter().enumerate() {
            let raw = raw.into();
            let waypoint = GeoPoint::try_new(raw.latitude, raw.longitude)
                .map_err(|source| RouteError::InvalidWaypoint { index, source })?;

            if waypoints.last() == Some(&waypoint) {
                tracing::trace!(index, %waypoint, "Discarded duplicate waypoint");
                continue;
            }
            waypoints.push(waypoint);
        }

        if waypoints.is_empty() {
            return Err(RouteError::EmptyRoute);
        }

        Ok(Self { waypoints })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn get(&self, index: usize) -> Option<Waypoint> {
        self.waypoints.get(index).copied()
    }

    /// Number of waypoints (always at least one).
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; a route cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Distance of each leg in nautical miles (`len() - 1` values).
    pub fn leg_distances_nm(&self) -> Vec<f64> {
        self.waypoints
            .windows(2)
            .map(|pair| distance_nm(pair[0], pair[1]))
            .collect()
    }

    /// Distance from the first waypoint to each waypoint along the route.
    ///
    /// Aligned 1:1 with the waypoints; the first value is 0.
    pub fn cumulative_distances_nm(&self) -> Vec<f64> {
        let mut total = 0.0;
        std::iter::once(0.0)
            .chain(self.leg_distances_nm().into_iter().map(|leg| {
                total += leg;
                total
            }))
            .collect()
    }

    /// Total route length in nautical miles.
    pub fn total_distance_nm(&self) -> f64 {
        self.leg_distances_nm().iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_duplicates_dropped() {
        let route = Route::new([(59.0, 18.0), (59.0, 18.0), (59.1, 18.0), (59.1, 18.0)]).unwrap();
        assert_eq!(route.len(), 2);
    }

    #[test]
    fn test_non_consecutive_duplicates_kept() {
        let route = Route::new([(59.0, 18.0), (59.1, 18.0), (59.0, 18.0)]).unwrap();
        assert_eq!(route.len(), 3);
    }

    #[test]
    fn test_empty_route_rejected() {
        let raw: Vec<(f64, f64)> = Vec::new();
        assert_eq!(Route::new(raw), Err(RouteError::EmptyRoute));
    }

    #[test]
    fn test_invalid_waypoint_rejected() {
        let result = Route::new([(59.0, 18.0), (95.0, 18.0)]);
        assert!(matches!(
            result,
            Err(RouteError::InvalidWaypoint { index: 1, .. })
        ));
    }

    #[test]
    fn test_total_distance_is_sum_of_legs() {
        let route = Route::new([(59.0, 18.0), (59.1, 18.0), (59.1, 18.2)]).unwrap();
        let legs = route.leg_distances_nm();
        assert_eq!(legs.len(), 2);

        let expected = distance_nm(GeoPoint::new(59.0, 18.0), GeoPoint::new(59.1, 18.0))
            + distance_nm(GeoPoint::new(59.1, 18.0), GeoPoint::new(59.1, 18.2));
        assert!((route.total_distance_nm() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_distances() {
        let route = Route::new([(59.0, 18.0), (59.1, 18.0), (59.2, 18.0)]).unwrap();
        let cumulative = route.cumulative_distances_nm();

        assert_eq!(cumulative.len(), 3);
        assert_eq!(cumulative[0], 0.0);
        assert!((cumulative[2] - route.total_distance_nm()).abs() < 1e-12);
    }

    #[test]
    fn test_single_point_route_has_zero_length() {
        let route = Route::new([(59.0, 18.0)]).unwrap();
        assert_eq!(route.total_distance_nm(), 0.0);
        assert!(route.leg_distances_nm().is_empty());
    }
}
