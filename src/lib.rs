//! Restaurant Dedup - cleaning and deduplication of aggregated delivery-platform listings
//!
//! Raw listings pass through four stages: normalization, reverse-geocoded
//! enrichment with a U.S. region gate, name-similarity clustering within each
//! locality, and greedy proximity merging inside each name cluster.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Pipeline, PipelineError, PipelineOutput, Stage, find_geo_duplicates, normalize};
pub use crate::models::{ActiveStatus, PipelineReport, RawRecord, RestaurantRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let (records, stats) = normalize(Vec::new());
        assert!(records.is_empty());
        assert_eq!(stats.output_rows, 0);
        assert_eq!(Stage::default(), Stage::Full);
    }
}
