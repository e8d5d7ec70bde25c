use crate::core::agglomerative::{cluster_labels, Linkage};
use crate::models::{RestaurantRecord, RowId};
use crate::services::embedder::{EmbedderError, NameEmbedder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default embedding-distance cutoff for name clusters
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.3;

/// Groups records of one locality whose names embed close together
///
/// Lower thresholds give stricter, smaller clusters.
#[derive(Clone)]
pub struct NameClusterer {
    embedder: Arc<dyn NameEmbedder>,
    distance_threshold: f64,
    linkage: Linkage,
}

impl NameClusterer {
    pub fn new(embedder: Arc<dyn NameEmbedder>, distance_threshold: f64, linkage: Linkage) -> Self {
        Self {
            embedder,
            distance_threshold,
            linkage,
        }
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Map each record's row id to a cluster label
    ///
    /// Labels are only comparable within one call. An empty group yields an empty map.
    pub fn cluster(&self, group: &[RestaurantRecord]) -> Result<HashMap<RowId, usize>, EmbedderError> {
        if group.is_empty() {
            return Ok(HashMap::new());
        }

        let names: Vec<&str> = group.iter().map(|record| record.name.as_str()).collect();
        let vectors = self.embedder.embed_batch(&names)?;
        if vectors.len() != names.len() {
            return Err(EmbedderError::BatchMismatch {
                expected: names.len(),
                actual: vectors.len(),
            });
        }

        let labels = cluster_labels(&vectors, self.distance_threshold, self.linkage);
        debug!(
            records = group.len(),
            clusters = labels.iter().max().map_or(0, |max| max + 1),
            "name clustering complete"
        );

        Ok(group
            .iter()
            .zip(labels)
            .map(|(record, label)| (record.row_id, label))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActiveStatus;
    use crate::config::Settings;
    use crate::services::embedder::CharNgramEmbedder;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(row_id: RowId, name: &str) -> RestaurantRecord {
        let empty: Arc<str> = Arc::from("");
        RestaurantRecord {
            row_id,
            name: name.to_string(),
            platform: Arc::clone(&empty),
            sub_platform: Arc::clone(&empty),
            latitude: 40.0,
            longitude: -74.0,
            active: ActiveStatus::Active,
            city: Arc::clone(&empty),
            state: Arc::clone(&empty),
            country: Arc::clone(&empty),
            postal_code: empty,
            group_id: None,
            extra: BTreeMap::new(),
        }
    }

    fn clusterer() -> NameClusterer {
        let embedder = CharNgramEmbedder::hashed(128, 1, 3).unwrap();
        NameClusterer::new(Arc::new(embedder), DEFAULT_DISTANCE_THRESHOLD, Linkage::Ward)
    }

    #[test]
    fn test_empty_group_is_noop() {
        assert!(clusterer().cluster(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_identical_names_share_label() {
        let group = vec![
            record(10, "joes pizza"),
            record(11, "golden dragon"),
            record(12, "joes pizza"),
        ];

        let labels = clusterer().cluster(&group).unwrap();

        assert_eq!(labels.len(), 3);
        assert_eq!(labels[&10], labels[&12]);
        assert_ne!(labels[&10], labels[&11]);
    }

    fn default_clusterer() -> NameClusterer {
        let settings = Settings::default();
        let shape = &settings.clustering.embedder;
        let embedder = CharNgramEmbedder::hashed(shape.dimension, shape.ngram_min, shape.ngram_max).unwrap();
        NameClusterer::new(
            Arc::new(embedder),
            settings.clustering.distance_threshold,
            settings.clustering.linkage,
        )
    }

    fn same_cluster(clusterer: &NameClusterer, a: &str, b: &str) -> bool {
        let labels = clusterer.cluster(&[record(0, a), record(1, b)]).unwrap();
        labels[&0] == labels[&1]
    }

    #[test]
    fn test_default_settings_cluster_typo_variants() {
        let clusterer = default_clusterer();

        assert!(same_cluster(&clusterer, "joes pizza", "joes piza"));
        assert!(same_cluster(&clusterer, "burger king", "burger kin"));
        assert!(same_cluster(&clusterer, "starbucks", "starbuck"));
        assert!(!same_cluster(&clusterer, "joes pizza", "pizza hut"));
    }

    #[test]
    fn test_names_unknown_to_pretrained_model_stay_apart() {
        let mut learned = vec![0.0f32; 50];
        learned[0] = 1.0;
        let model = serde_json::json!({
            "dimension": 50,
            "ngram_min": 1,
            "ngram_max": 3,
            "vectors": { "a": learned },
        });
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", model).unwrap();

        let embedder = CharNgramEmbedder::from_json(file.path()).unwrap();
        let clusterer = NameClusterer::new(Arc::new(embedder), DEFAULT_DISTANCE_THRESHOLD, Linkage::Ward);

        assert!(!same_cluster(&clusterer, "sushi house", "the grill"));
    }

    struct ShortEmbedder;

    impl NameEmbedder for ShortEmbedder {
        fn dimension(&self) -> usize {
            1
        }

        fn embed_batch(&self, _names: &[&str]) -> crate::services::embedder::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0]])
        }
    }

    #[test]
    fn test_embedder_batch_mismatch_is_error() {
        let clusterer = NameClusterer::new(Arc::new(ShortEmbedder), 0.3, Linkage::Ward);
        let group = vec![record(0, "a"), record(1, "b")];

        assert!(matches!(
            clusterer.cluster(&group),
            Err(EmbedderError::BatchMismatch { expected: 2, actual: 1 })
        ));
    }
}
