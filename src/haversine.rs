//! Great-circle distance helpers (fallback when road routing is unavailable).
//!
//! Less accurate than road routing (ignores the network) but always available.

use crate::route::Coordinate;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Average driving speed assumed when the routing service supplies no duration.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Great-circle distance between two points in meters.
pub fn great_circle_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Whether `probe` lies within `radius_meters` of `target`.
pub fn within_radius(probe: Coordinate, target: Coordinate, radius_meters: f64) -> bool {
    great_circle_meters(probe, target) <= radius_meters
}

/// Travel time in seconds for a distance at an assumed average speed.
pub fn estimate_duration_seconds(distance_meters: f64, speed_kmh: f64) -> f64 {
    let meters_per_second = speed_kmh * 1000.0 / 3600.0;
    distance_meters / meters_per_second
}
