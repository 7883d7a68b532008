//! Waypoint passage detection and route progress tracking.

use crate::geo::{distance_nm, GeoPoint};
use crate::route::Route;

/// Default radius around the final waypoint that counts as arrived (NM).
pub const DEFAULT_ARRIVAL_RADIUS_NM: f64 = 0.01;

/// True if `current` lies beyond `passed` in the direction of `next`.
///
/// Uses planar latitude/longitude differences: the vessel has passed once
/// the dot product of `next - passed` and `current - passed` is positive.
pub fn has_passed_waypoint(passed: GeoPoint, next: GeoPoint, current: GeoPoint) -> bool {
    let leg = (
        next.latitude - passed.latitude,
        next.longitude - passed.longitude,
    );
    let offset = (
        current.latitude - passed.latitude,
        current.longitude - passed.longitude,
    );
    leg.0 * offset.0 + leg.1 * offset.1 > 0.0
}

/// Follows a vessel along a route, one target waypoint at a time.
#[derive(Debug, Clone)]
pub struct RouteProgress {
    route: Route,
    target: usize,
    arrival_radius_nm: f64,
    finished: bool,
}

impl RouteProgress {
    /// Start heading for the first waypoint after the start point.
    pub fn new(route: Route) -> Self {
        Self::with_arrival_radius(route, DEFAULT_ARRIVAL_RADIUS_NM)
    }

    pub fn with_arrival_radius(route: Route, arrival_radius_nm: f64) -> Self {
        let target = 1.min(route.len().saturating_sub(1));
        Self {
            route,
            target,
            arrival_radius_nm,
            finished: false,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Index of the waypoint currently steered for.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance past every waypoint the vessel has passed.
    ///
    /// Returns the new target index. The final waypoint is reached when the
    /// vessel is within the arrival radius of it or has passed it along the
    /// last leg.
    pub fn update(&mut self, position: GeoPoint) -> usize {
        if self.finished {
            return self.target;
        }

        let last = self.route.len() - 1;
        let waypoints = self.route.waypoints();

        while self.target < last
            && has_passed_waypoint(waypoints[self.target], waypoints[self.target + 1], position)
        {
            self.target += 1;
            tracing::debug!(waypoint = self.target, "Waypoint passed, steering for next");
        }

        if self.target == last {
            let final_waypoint = waypoints[last];
            let overshot = last > 0 && {
                let previous = waypoints[last - 1];
                // Mirror the previous waypoint through the final one to get
                // a point further along the last leg.
                let beyond = GeoPoint::new(
                    2.0 * final_waypoint.latitude - previous.latitude,
                    2.0 * final_waypoint.longitude - previous.longitude,
                );
                has_passed_waypoint(final_waypoint, beyond, position)
            };

            if overshot || distance_nm(position, final_waypoint) <= self.arrival_radius_nm {
                self.finished = true;
                tracing::info!(waypoint = last, "Final waypoint reached");
            }
        }

        self.target
    }
}
