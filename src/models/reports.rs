use serde::{Deserialize, Serialize};

/// Rows removed by the normalizer, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub input_rows: usize,
    pub null_names: usize,
    pub missing_coordinates: usize,
    pub duplicates: usize,
    /// Latitude simultaneously above 90 and below -90. Always zero; kept as a feed sanity counter.
    pub impossible_coordinates: usize,
    pub out_of_range: usize,
    pub output_rows: usize,
}

/// Rows removed by the geo-enricher, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichStats {
    pub input_rows: usize,
    pub not_in_scope: usize,
    pub unknown_status: usize,
    pub distinct_localities: usize,
    pub output_rows: usize,
}

/// Outcome of name clustering and proximity merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub input_rows: usize,
    pub localities: usize,
    pub name_clusters: usize,
    pub geo_duplicates: usize,
    pub output_rows: usize,
}

/// Summary of a whole run, written next to the cleaned table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub stage: String,
    #[serde(rename = "inputRows")]
    pub input_rows: usize,
    #[serde(rename = "outputRows")]
    pub output_rows: usize,
    pub normalize: NormalizeStats,
    #[serde(default)]
    pub enrich: Option<EnrichStats>,
    #[serde(default)]
    pub dedup: Option<DedupStats>,
}
