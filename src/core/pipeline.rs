use crate::config::Settings;
use crate::core::clustering::NameClusterer;
use crate::core::distance::DistanceMetric;
use crate::core::enricher::GeoEnricher;
use crate::core::merger::find_geo_duplicates;
use crate::core::normalizer::normalize;
use crate::models::{DedupStats, Locality, PipelineReport, RawRecord, RestaurantRecord, RowId};
use crate::services::dataset::DatasetError;
use crate::services::embedder::{CharNgramEmbedder, EmbedderError, NameEmbedder};
use crate::services::geocoder::{Gazetteer, GeocoderError, ReverseGeocoder};
use crate::services::regions::{RegionError, RegionTable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Geocoder error: {0}")]
    Geocoder(#[from] GeocoderError),

    #[error("Region table error: {0}")]
    Region(#[from] RegionError),

    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),
}

/// Last stage to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Enrich,
    #[default]
    Full,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Enrich => "enrich",
            Stage::Full => "full",
        }
    }
}

/// Final table plus the run summary
#[derive(Debug)]
pub struct PipelineOutput {
    pub records: Vec<RestaurantRecord>,
    pub report: PipelineReport,
}

/// Stages 3 and 4: name clustering and proximity merging per locality
#[derive(Clone)]
pub struct Deduplicator {
    clusterer: NameClusterer,
    proximity_threshold_km: f64,
    metric: DistanceMetric,
    parallel: bool,
}

/// Result of deduplicating one locality
struct LocalityOutcome {
    records: Vec<RestaurantRecord>,
    name_clusters: usize,
    geo_duplicates: usize,
}

impl Deduplicator {
    pub fn new(
        clusterer: NameClusterer,
        proximity_threshold_km: f64,
        metric: DistanceMetric,
        parallel: bool,
    ) -> Self {
        Self {
            clusterer,
            proximity_threshold_km,
            metric,
            parallel,
        }
    }

    /// Remove geographic duplicates among similarly named records of each locality
    ///
    /// Localities never interact, so they may run in parallel. Output is grouped
    /// by locality in key order and sorted by name-cluster label within each.
    pub fn deduplicate(
        &self,
        records: Vec<RestaurantRecord>,
    ) -> Result<(Vec<RestaurantRecord>, DedupStats), EmbedderError> {
        let input_rows = records.len();

        let mut by_locality: BTreeMap<Locality, Vec<RestaurantRecord>> = BTreeMap::new();
        for record in records {
            by_locality.entry(record.locality()).or_default().push(record);
        }
        let groups: Vec<Vec<RestaurantRecord>> = by_locality.into_values().collect();
        let localities = groups.len();

        let outcomes: Vec<LocalityOutcome> = if self.parallel {
            groups
                .into_par_iter()
                .map(|group| self.deduplicate_locality(group))
                .collect::<Result<Vec<_>, EmbedderError>>()?
        } else {
            groups
                .into_iter()
                .map(|group| self.deduplicate_locality(group))
                .collect::<Result<Vec<_>, EmbedderError>>()?
        };

        let mut stats = DedupStats {
            input_rows,
            localities,
            ..DedupStats::default()
        };
        let mut survivors = Vec::with_capacity(input_rows);
        for outcome in outcomes {
            stats.name_clusters += outcome.name_clusters;
            stats.geo_duplicates += outcome.geo_duplicates;
            survivors.extend(outcome.records);
        }
        stats.output_rows = survivors.len();

        info!(
            input_rows = stats.input_rows,
            localities = stats.localities,
            name_clusters = stats.name_clusters,
            geo_duplicates = stats.geo_duplicates,
            output_rows = stats.output_rows,
            distance_threshold = self.clusterer.distance_threshold(),
            linkage = ?self.clusterer.linkage(),
            "deduplication complete"
        );

        Ok((survivors, stats))
    }

    fn deduplicate_locality(&self, group: Vec<RestaurantRecord>) -> Result<LocalityOutcome, EmbedderError> {
        let labels = self.clusterer.cluster(&group)?;

        let mut labelled: Vec<RestaurantRecord> = group
            .into_iter()
            .filter_map(|mut record| {
                record.group_id = Some(*labels.get(&record.row_id)?);
                Some(record)
            })
            .collect();
        labelled.sort_by_key(|record| record.group_id);

        let mut to_drop: HashSet<RowId> = HashSet::new();
        let mut name_clusters = 0;
        for cluster in labelled.chunk_by(|a, b| a.group_id == b.group_id) {
            name_clusters += 1;
            to_drop.extend(find_geo_duplicates(cluster, self.proximity_threshold_km, self.metric));
        }

        if let Some(first) = labelled.first() {
            debug!(
                city = %first.city,
                state = %first.state,
                records = labelled.len(),
                name_clusters,
                dropped = to_drop.len(),
                "locality deduplicated"
            );
        }

        let geo_duplicates = to_drop.len();
        labelled.retain(|record| !to_drop.contains(&record.row_id));

        Ok(LocalityOutcome {
            records: labelled,
            name_clusters,
            geo_duplicates,
        })
    }
}

/// Normalizer, enricher and deduplicator wired over shared read-only resources
pub struct Pipeline {
    enricher: GeoEnricher,
    deduplicator: Deduplicator,
}

impl Pipeline {
    pub fn new(enricher: GeoEnricher, deduplicator: Deduplicator) -> Self {
        Self {
            enricher,
            deduplicator,
        }
    }

    /// Assemble a pipeline from explicitly provided collaborators
    pub fn with_resources(
        settings: &Settings,
        geocoder: Arc<dyn ReverseGeocoder>,
        regions: Arc<RegionTable>,
        embedder: Arc<dyn NameEmbedder>,
    ) -> Self {
        let enricher = GeoEnricher::new(geocoder, regions, settings.enrich.drop_columns.clone());
        let clusterer = NameClusterer::new(
            embedder,
            settings.clustering.distance_threshold,
            settings.clustering.linkage,
        );
        let deduplicator = Deduplicator::new(
            clusterer,
            settings.merge.proximity_threshold_km,
            settings.merge.metric,
            settings.pipeline.parallel,
        );
        Self::new(enricher, deduplicator)
    }

    /// Load the gazetteer, region table and embedding model named in `settings`
    ///
    /// Any resource failing to load is fatal.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let geocoder = Gazetteer::from_csv(&settings.enrich.gazetteer_path)?;

        let regions = match &settings.enrich.region_table_path {
            Some(path) => RegionTable::from_csv(path)?,
            None => RegionTable::us_states(),
        };

        let embedder_settings = &settings.clustering.embedder;
        let embedder = match &embedder_settings.model_path {
            Some(path) => CharNgramEmbedder::from_json(path)?,
            None => CharNgramEmbedder::hashed(
                embedder_settings.dimension,
                embedder_settings.ngram_min,
                embedder_settings.ngram_max,
            )?,
        };

        info!(
            places = geocoder.len(),
            regions = regions.len(),
            dimension = embedder.dimension(),
            linkage = ?settings.clustering.linkage,
            "pipeline resources loaded"
        );

        Ok(Self::with_resources(
            settings,
            Arc::new(geocoder),
            Arc::new(regions),
            Arc::new(embedder),
        ))
    }

    /// Run every stage up to and including `stage`
    pub fn run(&self, raw: Vec<RawRecord>, stage: Stage) -> Result<PipelineOutput, PipelineError> {
        let input_rows = raw.len();
        let mut report = PipelineReport {
            generated_at: chrono::Utc::now(),
            stage: stage.as_str().to_string(),
            input_rows,
            output_rows: 0,
            normalize: Default::default(),
            enrich: None,
            dedup: None,
        };

        let (mut records, normalize_stats) = normalize(raw);
        report.normalize = normalize_stats;

        if stage != Stage::Normalize {
            let (enriched, enrich_stats) = self.enricher.enrich(records)?;
            report.enrich = Some(enrich_stats);
            records = enriched;
        }

        if stage == Stage::Full {
            let (deduplicated, dedup_stats) = self.deduplicator.deduplicate(records)?;
            report.dedup = Some(dedup_stats);
            records = deduplicated;
        }

        report.output_rows = records.len();
        info!(
            stage = stage.as_str(),
            input_rows,
            output_rows = report.output_rows,
            "pipeline finished"
        );

        Ok(PipelineOutput { records, report })
    }
}
