//! Geodesy primitives
//!
//! Great-circle distance and bearing on a spherical Earth, plus a local
//! equirectangular projection used for small-scale geometry around a single
//! pivot point (turn gates, waypoint passage).
//!
//! The projection is only accurate within a few kilometers of its origin and
//! must never be used for route-length computations; use [`distance_nm`] for
//! those.

mod types;

pub use types::{
    CoordError, GeoPoint, LocalPoint, EARTH_RADIUS_M, EARTH_RADIUS_NM, MAX_LAT, MAX_LON, MIN_LAT,
    MIN_LON,
};

/// Great-circle distance between two points in nautical miles (haversine).
///
/// Symmetric, and exactly zero for identical points.
#[inline]
pub fn distance_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h marginally outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_NM * c
}

/// Initial bearing from `a` towards `b` in degrees, normalized to [0, 360).
///
/// For identical points the direction is undefined; 0.0 is returned.
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Normalize an angle to [0, 360) degrees.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Project a point into the tangent plane centered at `origin`.
///
/// Equirectangular approximation: the x axis is scaled by the cosine of the
/// origin latitude.
#[inline]
pub fn project_local(point: GeoPoint, origin: GeoPoint) -> LocalPoint {
    let cos_lat = origin.latitude.to_radians().cos();
    LocalPoint::new(
        EARTH_RADIUS_M * (point.longitude - origin.longitude).to_radians() * cos_lat,
        EARTH_RADIUS_M * (point.latitude - origin.latitude).to_radians(),
    )
}

/// Inverse of [`project_local`] for the same origin.
#[inline]
pub fn unproject_local(xy: LocalPoint, origin: GeoPoint) -> GeoPoint {
    let cos_lat = origin.latitude.to_radians().cos();
    GeoPoint::new(
        origin.latitude + (xy.y / EARTH_RADIUS_M).to_degrees(),
        origin.longitude + (xy.x / (EARTH_RADIUS_M * cos_lat)).to_degrees(),
    )
}
