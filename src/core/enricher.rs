use crate::models::{CategoryPool, EnrichStats, RestaurantRecord};
use crate::services::geocoder::{GeocoderError, ReverseGeocoder};
use crate::services::regions::RegionTable;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Extra columns with no use after enrichment
pub const DEFAULT_DROP_COLUMNS: &[&str] = &["delivery_radius", "geom"];

/// Stage 2: attach administrative labels and keep only in-scope, status-known records
pub struct GeoEnricher {
    geocoder: Arc<dyn ReverseGeocoder>,
    regions: Arc<RegionTable>,
    drop_columns: Vec<String>,
}

impl GeoEnricher {
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        regions: Arc<RegionTable>,
        drop_columns: Vec<String>,
    ) -> Self {
        Self {
            geocoder,
            regions,
            drop_columns,
        }
    }

    /// Reverse-geocode every record in one batch, then filter
    ///
    /// A record survives when its state label joins the region table and its
    /// active status is known. Text labels are interned so each distinct city,
    /// state, country and platform value is stored once.
    pub fn enrich(
        &self,
        records: Vec<RestaurantRecord>,
    ) -> Result<(Vec<RestaurantRecord>, EnrichStats), GeocoderError> {
        let mut stats = EnrichStats {
            input_rows: records.len(),
            ..EnrichStats::default()
        };

        let coordinates: Vec<(f64, f64)> = records
            .iter()
            .map(|record| (record.latitude, record.longitude))
            .collect();
        let locations = self.geocoder.lookup_batch(&coordinates)?;
        if locations.len() != records.len() {
            return Err(GeocoderError::BatchMismatch {
                expected: records.len(),
                actual: locations.len(),
            });
        }

        let mut pool = CategoryPool::new();
        let mut localities = HashSet::new();
        let mut enriched = Vec::with_capacity(records.len());

        for (mut record, location) in records.into_iter().zip(locations) {
            let state = location.state.unwrap_or_default();
            let Some(region) = self.regions.lookup(&state) else {
                debug!(row_id = record.row_id, state = %state, "region not recognized");
                stats.not_in_scope += 1;
                continue;
            };

            if !record.active.is_known() {
                stats.unknown_status += 1;
                continue;
            }

            record.city = pool.intern(location.city.as_deref().unwrap_or_default());
            record.state = pool.intern(&state);
            record.country = pool.intern(location.country_code.as_deref().unwrap_or_default());
            record.postal_code = pool.intern(&region.postal_code);
            record.platform = pool.intern(&record.platform);
            record.sub_platform = pool.intern(&record.sub_platform);
            for column in &self.drop_columns {
                record.extra.remove(column);
            }

            localities.insert(record.locality());
            enriched.push(record);
        }

        stats.distinct_localities = localities.len();
        stats.output_rows = enriched.len();

        info!(
            input_rows = stats.input_rows,
            not_in_scope = stats.not_in_scope,
            unknown_status = stats.unknown_status,
            localities = stats.distinct_localities,
            categories = pool.len(),
            output_rows = stats.output_rows,
            "enrichment complete"
        );

        Ok((enriched, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActiveStatus, Location};
    use std::collections::BTreeMap;

    /// Southern hemisphere resolves to nothing, west of -100 is California, else New York
    struct SplitGeocoder;

    impl ReverseGeocoder for SplitGeocoder {
        fn lookup_batch(&self, coordinates: &[(f64, f64)]) -> Result<Vec<Location>, GeocoderError> {
            Ok(coordinates
                .iter()
                .map(|&(lat, lon)| {
                    if lat < 0.0 {
                        Location::default()
                    } else if lon < -100.0 {
                        Location {
                            city: Some("Los Angeles County".to_string()),
                            state: Some("California".to_string()),
                            country_code: Some("US".to_string()),
                        }
                    } else {
                        Location {
                            city: None,
                            state: Some("New York".to_string()),
                            country_code: Some("US".to_string()),
                        }
                    }
                })
                .collect())
        }
    }

    fn record(row_id: usize, lat: f64, lon: f64, active: ActiveStatus) -> RestaurantRecord {
        let empty: Arc<str> = Arc::from("");
        let mut extra = BTreeMap::new();
        extra.insert("geom".to_string(), "POINT(0 0)".to_string());
        extra.insert("cuisine".to_string(), "pizza".to_string());
        RestaurantRecord {
            row_id,
            name: "joes pizza".to_string(),
            platform: Arc::from("doordash"),
            sub_platform: Arc::clone(&empty),
            latitude: lat,
            longitude: lon,
            active,
            city: Arc::clone(&empty),
            state: Arc::clone(&empty),
            country: Arc::clone(&empty),
            postal_code: empty,
            group_id: None,
            extra,
        }
    }

    fn enricher() -> GeoEnricher {
        GeoEnricher::new(
            Arc::new(SplitGeocoder),
            Arc::new(RegionTable::us_states()),
            DEFAULT_DROP_COLUMNS.iter().map(|c| c.to_string()).collect(),
        )
    }

    #[test]
    fn test_enrich_labels_and_filters() {
        let records = vec![
            record(0, 34.05, -118.24, ActiveStatus::Active),
            record(1, 40.71, -74.00, ActiveStatus::Inactive),
            record(2, -33.86, 151.2, ActiveStatus::Active),
            record(3, 40.72, -74.01, ActiveStatus::Unknown),
        ];

        let (enriched, stats) = enricher().enrich(records).unwrap();

        assert_eq!(stats.not_in_scope, 1);
        assert_eq!(stats.unknown_status, 1);
        assert_eq!(stats.distinct_localities, 2);
        assert_eq!(enriched.len(), 2);

        assert_eq!(&*enriched[0].state, "California");
        assert_eq!(&*enriched[0].postal_code, "CA");
        assert_eq!(&*enriched[1].city, "");
        assert_eq!(&*enriched[1].postal_code, "NY");
        assert_eq!(&*enriched[1].country, "US");
    }

    #[test]
    fn test_enrich_drops_configured_columns() {
        let (enriched, _) = enricher()
            .enrich(vec![record(0, 40.71, -74.00, ActiveStatus::Active)])
            .unwrap();

        assert!(!enriched[0].extra.contains_key("geom"));
        assert_eq!(enriched[0].extra.get("cuisine").map(String::as_str), Some("pizza"));
    }

    #[test]
    fn test_enrich_interns_labels() {
        let (enriched, _) = enricher()
            .enrich(vec![
                record(0, 40.71, -74.00, ActiveStatus::Active),
                record(1, 40.75, -73.98, ActiveStatus::Active),
            ])
            .unwrap();

        assert!(Arc::ptr_eq(&enriched[0].state, &enriched[1].state));
        assert!(Arc::ptr_eq(&enriched[0].platform, &enriched[1].platform));
    }

    struct DroppingGeocoder;

    impl ReverseGeocoder for DroppingGeocoder {
        fn lookup_batch(&self, _coordinates: &[(f64, f64)]) -> Result<Vec<Location>, GeocoderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_short_batch_is_error() {
        let enricher = GeoEnricher::new(
            Arc::new(DroppingGeocoder),
            Arc::new(RegionTable::us_states()),
            Vec::new(),
        );

        let result = enricher.enrich(vec![record(0, 40.71, -74.00, ActiveStatus::Active)]);

        assert!(matches!(result, Err(GeocoderError::BatchMismatch { expected: 1, actual: 0 })));
    }
}
