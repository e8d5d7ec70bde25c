use crate::models::{ActiveStatus, CategoryPool, NormalizeStats, RawRecord, RestaurantRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// ASCII punctuation removed from names, as a fixed set
pub const PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Canonical form of a listing name: trimmed, lowercased, punctuation removed
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !PUNCTUATION.contains(*c))
        .collect();
    stripped.trim().to_string()
}

/// Parse a coordinate cell. Unparseable and non-finite values are missing.
///
/// Negative zero is folded into zero so equal coordinates share one bit pattern.
pub fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .map(|value| value + 0.0)
}

#[inline]
pub fn is_valid_latitude(latitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude)
}

/// Exact identity of a listing for duplicate detection
#[derive(Hash, PartialEq, Eq)]
struct DuplicateKey {
    name: String,
    platform: Arc<str>,
    latitude: u64,
    longitude: u64,
}

/// Stage 1: drop structurally invalid rows and canonicalize the rest
///
/// Rows are kept in input order. The first occurrence of each
/// `(name, platform, latitude, longitude)` key wins; since the key is taken
/// after canonicalization, feeding the output back in removes nothing.
pub fn normalize(raw: Vec<RawRecord>) -> (Vec<RestaurantRecord>, NormalizeStats) {
    let mut stats = NormalizeStats {
        input_rows: raw.len(),
        ..NormalizeStats::default()
    };
    let mut pool = CategoryPool::new();
    let mut seen: HashSet<DuplicateKey> = HashSet::with_capacity(raw.len());
    let mut records = Vec::with_capacity(raw.len());
    let empty = pool.intern("");

    for (row_id, row) in raw.into_iter().enumerate() {
        let name = match row.name.as_deref().map(normalize_name) {
            Some(name) if !name.is_empty() => name,
            _ => {
                stats.null_names += 1;
                continue;
            }
        };

        let (latitude, longitude) = match (
            parse_coordinate(row.latitude.as_deref()),
            parse_coordinate(row.longitude.as_deref()),
        ) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                stats.missing_coordinates += 1;
                continue;
            }
        };

        if latitude > 90.0 && latitude < -90.0 {
            stats.impossible_coordinates += 1;
        }
        if !is_valid_latitude(latitude) {
            stats.out_of_range += 1;
            continue;
        }

        let platform = pool.intern(row.platform.as_deref().unwrap_or("").trim());
        let key = DuplicateKey {
            name: name.clone(),
            platform: Arc::clone(&platform),
            latitude: latitude.to_bits(),
            longitude: longitude.to_bits(),
        };
        if !seen.insert(key) {
            debug!(row_id, name = %name, "duplicate listing removed");
            stats.duplicates += 1;
            continue;
        }

        records.push(RestaurantRecord {
            row_id,
            name,
            platform,
            sub_platform: pool.intern(row.sub_platform.as_deref().unwrap_or("").trim()),
            latitude,
            longitude,
            active: ActiveStatus::parse(row.active.as_deref()),
            city: Arc::clone(&empty),
            state: Arc::clone(&empty),
            country: Arc::clone(&empty),
            postal_code: Arc::clone(&empty),
            group_id: None,
            extra: row.extra,
        });
    }

    stats.output_rows = records.len();

    info!(
        input_rows = stats.input_rows,
        null_names = stats.null_names,
        missing_coordinates = stats.missing_coordinates,
        duplicates = stats.duplicates,
        impossible_coordinates = stats.impossible_coordinates,
        out_of_range = stats.out_of_range,
        output_rows = stats.output_rows,
        "normalization complete"
    );

    (records, stats)
}
