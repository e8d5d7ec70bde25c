use crate::models::BoundingBox;
use geo::{GeodesicDistance, Point};
use serde::{Deserialize, Serialize};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Round-off allowance when comparing a distance against a threshold
pub const DISTANCE_TOLERANCE_KM: f64 = 1e-9;

/// How the distance between two coordinates is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Ellipsoidal (WGS84) distance
    #[default]
    Geodesic,
    /// Great-circle distance on a sphere
    Haversine,
}

impl DistanceMetric {
    /// Distance in kilometers between two `(lat, lon)` points in degrees
    #[inline]
    pub fn distance_km(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        match self {
            DistanceMetric::Geodesic => geodesic_distance(lat1, lon1, lat2, lon2),
            DistanceMetric::Haversine => haversine_distance(lat1, lon1, lat2, lon2),
        }
    }
}

/// Calculate the geodesic distance on the WGS84 ellipsoid in kilometers
#[inline]
pub fn geodesic_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let a = Point::new(lon1, lat1);
    let b = Point::new(lon2, lat2);
    a.geodesic_distance(&b) / 1000.0
}

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Calculate a bounding box around a center point
///
/// Cheap pre-filter before the exact distance.
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
///
/// # Arguments
/// * `lat` - Center latitude in degrees
/// * `lon` - Center longitude in degrees
/// * `radius_km` - Radius in kilometers
///
/// # Returns
/// BoundingBox with min/max lat/lon
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    // 1 degree latitude is approximately 111 km
    let lat_delta = radius_km / 111.0;

    // 1 degree longitude varies by latitude
    let lon_delta = radius_km / (111.0 * lat.to_radians().cos().abs());

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
///
/// Longitude is compared as a wrapped offset from the box center, so a box
/// that spills past ±180° still contains points on the other side.
#[inline]
pub fn is_within_bounding_box(
    lat: f64,
    lon: f64,
    bbox: &BoundingBox,
) -> bool {
    let center_lon = (bbox.min_lon + bbox.max_lon) / 2.0;
    let half_span = (bbox.max_lon - bbox.min_lon) / 2.0;
    let lon_offset = (lon - center_lon + 180.0).rem_euclid(360.0) - 180.0;

    lat >= bbox.min_lat
        && lat <= bbox.max_lat
        && lon_offset.abs() <= half_span
}
