//! Gate lines at route turns and crossing detection.
//!
//! At each turn the gate is a short segment through the turn waypoint,
//! perpendicular to the bisector of the two legs. Positions are evaluated in
//! a local tangent plane centered on the waypoint, which is accurate for the
//! few hundred meters that matter here.

use crate::geo::{project_local, unproject_local, GeoPoint, LocalPoint};

/// Default half-width of a gate in meters.
pub const DEFAULT_CROSSING_EXTENSION_M: f64 = 50.0;

/// Bisector sums shorter than this are treated as a straight course.
const STRAIGHT_TOLERANCE: f64 = 1e-9;

/// Gate segment at a turn waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingOutline {
    /// One end of the gate.
    pub end1: GeoPoint,
    /// The other end of the gate.
    pub end2: GeoPoint,
    pivot: GeoPoint,
    bisector: LocalPoint,
    cut: LocalPoint,
    extension_m: f64,
}

impl CrossingOutline {
    /// Build the gate at `p2` for the turn `p1 -> p2 -> p3`.
    ///
    /// Returns `None` when either leg has zero length or the extension is
    /// not a positive distance. On a straight course the bisector follows
    /// the outgoing leg so the gate still lies across the track.
    pub fn at_turn(p1: GeoPoint, p2: GeoPoint, p3: GeoPoint, extension_m: f64) -> Option<Self> {
        if !(extension_m.is_finite() && extension_m > 0.0) {
            return None;
        }

        let towards_previous = project_local(p1, p2).normalized()?;
        let towards_next = project_local(p3, p2).normalized()?;

        let sum = towards_previous + towards_next;
        let bisector = if sum.length() < STRAIGHT_TOLERANCE {
            towards_next
        } else {
            sum.normalized()?
        };
        let cut = bisector.perpendicular();

        Some(Self {
            end1: unproject_local(cut * extension_m, p2),
            end2: unproject_local(cut * -extension_m, p2),
            pivot: p2,
            bisector,
            cut,
            extension_m,
        })
    }

    /// Signed distance from the gate line in meters, along the bisector.
    ///
    /// `None` when the position is further than the extension from the
    /// pivot along the gate, i.e. it would pass outside the gate.
    pub fn status(&self, position: GeoPoint) -> Option<f64> {
        let offset = project_local(position, self.pivot);
        if offset.dot(&self.cut).abs() > self.extension_m {
            return None;
        }
        Some(offset.dot(&self.bisector))
    }

    pub fn pivot(&self) -> GeoPoint {
        self.pivot
    }

    /// Unit bisector in the local plane (x east, y north).
    pub fn bisector(&self) -> LocalPoint {
        self.bisector
    }

    /// Unit direction along the gate.
    pub fn cut_direction(&self) -> LocalPoint {
        self.cut
    }

    pub fn extension_m(&self) -> f64 {
        self.extension_m
    }
}

/// Result of feeding one position to a [`GateCrossing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// Beyond the ends of the gate.
    Outside,
    /// Within the gate width, no crossing yet.
    Inside,
    /// Changed side of the gate line while within its width.
    Crossed,
}

/// Detects when successive positions cross a gate.
#[derive(Debug, Clone)]
pub struct GateCrossing {
    outline: CrossingOutline,
    last_side: Option<bool>,
}

impl GateCrossing {
    pub fn new(outline: CrossingOutline) -> Self {
        Self {
            outline,
            last_side: None,
        }
    }

    pub fn outline(&self) -> &CrossingOutline {
        &self.outline
    }

    /// Evaluate the next position.
    ///
    /// Leaving the gate width forgets the previous side. A position exactly
    /// on the line keeps it.
    pub fn update(&mut self, position: GeoPoint) -> GateEvent {
        let Some(distance) = self.outline.status(position) else {
            self.last_side = None;
            return GateEvent::Outside;
        };
        if distance == 0.0 {
            return GateEvent::Inside;
        }

        let side = distance > 0.0;
        let previous = self.last_side.replace(side);
        match previous {
            Some(previous) if previous != side => {
                tracing::debug!(
                    pivot = %self.outline.pivot,
                    distance_m = distance,
                    "Gate crossed"
                );
                GateEvent::Crossed
            }
            _ => GateEvent::Inside,
        }
    }

    pub fn reset(&mut self) {
        self.last_side = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{bearing_deg, distance_nm};

    const METERS_PER_NM: f64 = 1852.0;

    fn pivot() -> GeoPoint {
        GeoPoint::new(59.3, 18.1)
    }

    fn at(x: f64, y: f64) -> GeoPoint {
        unproject_local(LocalPoint::new(x, y), pivot())
    }

    /// Coming from the south, turning east.
    fn right_angle() -> CrossingOutline {
        CrossingOutline::at_turn(at(0.0, -500.0), pivot(), at(500.0, 0.0), 50.0).unwrap()
    }

    #[test]
    fn test_right_angle_endpoints_straddle_pivot() {
        let outline = right_angle();

        let d1 = distance_nm(pivot(), outline.end1) * METERS_PER_NM;
        let d2 = distance_nm(pivot(), outline.end2) * METERS_PER_NM;
        assert!((d1 - 50.0).abs() < 0.5, "end1 is {} m away", d1);
        assert!((d2 - 50.0).abs() < 0.5, "end2 is {} m away", d2);

        let b1 = bearing_deg(pivot(), outline.end1);
        let b2 = bearing_deg(pivot(), outline.end2);
        let separation = (b1 - b2).abs();
        assert!((separation - 180.0).abs() < 0.5, "bearings {} and {}", b1, b2);
    }

    #[test]
    fn test_right_angle_bisector_points_inside_turn() {
        let bisector = right_angle().bisector();
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!((bisector.x - half).abs() < 1e-3);
        assert!((bisector.y + half).abs() < 1e-3);
    }

    #[test]
    fn test_status_sign_and_width() {
        let outline = right_angle();

        let inside = outline.status(at(0.0, -10.0)).unwrap();
        let beyond = outline.status(at(0.0, 10.0)).unwrap();
        assert!(inside > 0.0);
        assert!(beyond < 0.0);
        assert!((inside - 10.0 * std::f64::consts::FRAC_1_SQRT_2).abs() < 0.1);

        // 100 m along the gate is past its 50 m end.
        let far = unproject_local(outline.cut_direction() * 100.0, pivot());
        assert_eq!(outline.status(far), None);
    }

    #[test]
    fn test_straight_course_gate_lies_across_track() {
        let outline =
            CrossingOutline::at_turn(at(0.0, -500.0), pivot(), at(0.0, 500.0), 50.0).unwrap();

        let cut = outline.cut_direction();
        assert!(cut.y.abs() < 1e-9);
        assert!((cut.x.abs() - 1.0).abs() < 1e-9);

        assert!(outline.status(at(0.0, -5.0)).unwrap() < 0.0);
        assert!(outline.status(at(0.0, 5.0)).unwrap() > 0.0);
    }

    #[test]
    fn test_degenerate_turns() {
        assert!(CrossingOutline::at_turn(pivot(), pivot(), at(100.0, 0.0), 50.0).is_none());
        assert!(CrossingOutline::at_turn(at(0.0, -100.0), pivot(), pivot(), 50.0).is_none());
        assert!(
            CrossingOutline::at_turn(at(0.0, -100.0), pivot(), at(100.0, 0.0), 0.0).is_none()
        );
    }

    #[test]
    fn test_gate_crossing_detects_side_change() {
        let outline =
            CrossingOutline::at_turn(at(0.0, -500.0), pivot(), at(0.0, 500.0), 50.0).unwrap();
        let mut gate = GateCrossing::new(outline);

        assert_eq!(gate.update(at(0.0, -30.0)), GateEvent::Inside);
        assert_eq!(gate.update(at(0.0, -10.0)), GateEvent::Inside);
        assert_eq!(gate.update(at(0.0, 10.0)), GateEvent::Crossed);
        assert_eq!(gate.update(at(0.0, 30.0)), GateEvent::Inside);
    }

    #[test]
    fn test_gate_crossing_outside_width_resets() {
        let outline =
            CrossingOutline::at_turn(at(0.0, -500.0), pivot(), at(0.0, 500.0), 50.0).unwrap();
        let mut gate = GateCrossing::new(outline);

        assert_eq!(gate.update(at(0.0, -10.0)), GateEvent::Inside);
        assert_eq!(gate.update(at(200.0, 0.0)), GateEvent::Outside);
        // Came back on the far side without passing through the gate.
        assert_eq!(gate.update(at(0.0, 10.0)), GateEvent::Inside);
    }
}
