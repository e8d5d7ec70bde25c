// Core algorithm exports
pub mod agglomerative;
pub mod clustering;
pub mod distance;
pub mod enricher;
pub mod merger;
pub mod normalizer;
pub mod pipeline;

pub use agglomerative::{cluster_labels, Linkage};
pub use clustering::NameClusterer;
pub use distance::{geodesic_distance, haversine_distance, DistanceMetric};
pub use enricher::GeoEnricher;
pub use merger::find_geo_duplicates;
pub use normalizer::normalize;
pub use pipeline::{Deduplicator, Pipeline, PipelineError, PipelineOutput, Stage};
