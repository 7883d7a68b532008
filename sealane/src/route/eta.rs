//! Planned ETA table construction.

use super::{Route, RouteError, TimeOfDay, Waypoint};

/// A waypoint paired with its planned arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaEntry {
    pub waypoint: Waypoint,
    pub planned_arrival: TimeOfDay,
}

/// Planned arrival times aligned 1:1 with a [`Route`].
///
/// Entry 0 is the route start, planned at the supplied start time.
#[derive(Debug, Clone, PartialEq)]
pub struct EtaTable {
    entries: Vec<EtaEntry>,
}

impl EtaTable {
    /// Build the ETA table for a planned start time and constant speed.
    ///
    /// Each arrival is the start time plus the cumulative distance from the
    /// first waypoint divided by `speed_knots`. Times wrap at midnight.
    pub fn build(
        route: &Route,
        start_time: TimeOfDay,
        speed_knots: f64,
    ) -> Result<Self, RouteError> {
        if route.len() > 1 && !(speed_knots.is_finite() && speed_knots > 0.0) {
            return Err(RouteError::InvalidSpeed(speed_knots));
        }

        let start_secs = start_time.as_seconds();
        let entries: Vec<EtaEntry> = route
            .waypoints()
            .iter()
            .zip(route.cumulative_distances_nm())
            .enumerate()
            .map(|(index, (&waypoint, distance))| {
                let planned_arrival = if index == 0 {
                    start_time
                } else {
                    let travel_secs = distance / speed_knots * 3600.0;
                    TimeOfDay::from_seconds(start_secs + travel_secs)
                };
                EtaEntry {
                    waypoint,
                    planned_arrival,
                }
            })
            .collect();

        tracing::debug!(
            waypoints = entries.len(),
            start = %start_time,
            speed_knots,
            "Built ETA table"
        );

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[EtaEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&EtaEntry> {
        self.entries.get(index)
    }

    pub fn planned_arrival(&self, index: usize) -> Option<TimeOfDay> {
        self.entries.get(index).map(|e| e.planned_arrival)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EtaEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_NM;

    /// Degrees of latitude per nautical mile on the model sphere.
    fn deg_per_nm() -> f64 {
        180.0 / (std::f64::consts::PI * EARTH_RADIUS_NM)
    }

    fn noon() -> TimeOfDay {
        TimeOfDay::from_hms_milli(12, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_three_waypoints_at_five_knots() {
        // Legs of 1 NM and 2 NM along a meridian
        let d = deg_per_nm();
        let route = Route::new([(59.0, 18.0), (59.0 + d, 18.0), (59.0 + 3.0 * d, 18.0)]).unwrap();

        let eta = EtaTable::build(&route, noon(), 5.0).unwrap();

        assert_eq!(eta.len(), 3);
        assert_eq!(eta.planned_arrival(0), Some(noon()));
        assert_eq!(
            eta.planned_arrival(1),
            TimeOfDay::from_hms_milli(12, 12, 0, 0)
        );
        assert_eq!(
            eta.planned_arrival(2),
            TimeOfDay::from_hms_milli(12, 36, 0, 0)
        );
    }

    #[test]
    fn test_entries_aligned_with_route() {
        let route = Route::new([(59.0, 18.0), (59.1, 18.1), (59.2, 18.0)]).unwrap();
        let eta = EtaTable::build(&route, noon(), 6.0).unwrap();

        for (entry, waypoint) in eta.iter().zip(route.waypoints()) {
            assert_eq!(&entry.waypoint, waypoint);
        }
    }

    #[test]
    fn test_entries_non_decreasing() {
        let route = Route::new([
            (59.0, 18.0),
            (59.05, 18.02),
            (59.1, 18.1),
            (59.12, 18.3),
            (59.2, 18.35),
        ])
        .unwrap();
        let start = TimeOfDay::from_hms_milli(8, 15, 0, 0).unwrap();
        let eta = EtaTable::build(&route, start, 4.5).unwrap();

        let times: Vec<f64> = eta.iter().map(|e| e.planned_arrival.as_seconds()).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]), "{:?}", times);
    }

    #[test]
    fn test_eta_wraps_past_midnight() {
        let d = deg_per_nm();
        let route = Route::new([(59.0, 18.0), (59.0 + 10.0 * d, 18.0)]).unwrap();
        let start = TimeOfDay::from_hms_milli(23, 30, 0, 0).unwrap();

        // 10 NM at 10 kn = 1 h
        let eta = EtaTable::build(&route, start, 10.0).unwrap();
        assert_eq!(eta.planned_arrival(1), TimeOfDay::from_hms_milli(0, 30, 0, 0));
    }

    #[test]
    fn test_zero_speed_rejected_for_multi_point_route() {
        let route = Route::new([(59.0, 18.0), (59.1, 18.0)]).unwrap();
        assert_eq!(
            EtaTable::build(&route, noon(), 0.0),
            Err(RouteError::InvalidSpeed(0.0))
        );
        assert!(EtaTable::build(&route, noon(), -2.0).is_err());
        assert!(EtaTable::build(&route, noon(), f64::NAN).is_err());
    }

    #[test]
    fn test_single_point_route_accepts_any_speed() {
        let route = Route::new([(59.0, 18.0)]).unwrap();
        let eta = EtaTable::build(&route, noon(), 0.0).unwrap();
        assert_eq!(eta.len(), 1);
        assert_eq!(eta.planned_arrival(0), Some(noon()));
    }
}
