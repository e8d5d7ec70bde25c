// Model exports
pub mod domain;
pub mod reports;

pub use domain::{ActiveStatus, BoundingBox, CategoryPool, Locality, Location, RawRecord, RestaurantRecord, RowId};
pub use reports::{DedupStats, EnrichStats, NormalizeStats, PipelineReport};
