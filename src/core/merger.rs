use crate::core::distance::{
    calculate_bounding_box, is_within_bounding_box, DistanceMetric, DISTANCE_TOLERANCE_KM,
};
use crate::models::{RestaurantRecord, RowId};

/// Records of one name cluster closer than this are the same restaurant
pub const DEFAULT_PROXIMITY_THRESHOLD_KM: f64 = 0.2;

/// Widening applied to the bounding-box pre-filter so the flat-earth
/// approximation never rejects a point the exact distance would accept
const BOUNDING_BOX_MARGIN: f64 = 1.05;

/// Greedy single-pass proximity merge over one name cluster
///
/// Walks the records in order, keeping a list of confirmed locations. A record
/// within `threshold_km` of any confirmed location is a duplicate and its row id
/// is returned; otherwise its coordinate becomes a new confirmed location. The
/// first record of a nonempty cluster always survives. The result depends on
/// input order when points form chains of near neighbours.
pub fn find_geo_duplicates(
    cluster: &[RestaurantRecord],
    threshold_km: f64,
    metric: DistanceMetric,
) -> Vec<RowId> {
    if cluster.len() < 2 {
        return Vec::new();
    }

    let mut seen: Vec<(f64, f64)> = Vec::new();
    let mut duplicates = Vec::new();

    for record in cluster {
        let bbox = calculate_bounding_box(
            record.latitude,
            record.longitude,
            threshold_km * BOUNDING_BOX_MARGIN,
        );

        let is_duplicate = seen.iter().any(|&(lat, lon)| {
            is_within_bounding_box(lat, lon, &bbox)
                && metric.distance_km(record.latitude, record.longitude, lat, lon)
                    <= threshold_km + DISTANCE_TOLERANCE_KM
        });

        if is_duplicate {
            duplicates.push(record.row_id);
        } else {
            seen.push((record.latitude, record.longitude));
        }
    }

    duplicates
}
