// Service exports
pub mod dataset;
pub mod embedder;
pub mod geocoder;
pub mod regions;

pub use dataset::{read_records, write_records, DatasetError};
pub use embedder::{CharNgramEmbedder, EmbedderError, NameEmbedder};
pub use geocoder::{Gazetteer, GeocoderError, Place, ReverseGeocoder};
pub use regions::{RegionCode, RegionError, RegionTable};
