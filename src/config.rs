use crate::core::agglomerative::Linkage;
use crate::core::clustering::DEFAULT_DISTANCE_THRESHOLD;
use crate::core::distance::DistanceMetric;
use crate::core::enricher::DEFAULT_DROP_COLUMNS;
use crate::core::merger::DEFAULT_PROXIMITY_THRESHOLD_KM;
use crate::services::embedder::{DEFAULT_DIMENSION, DEFAULT_NGRAM_MAX, DEFAULT_NGRAM_MIN};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineSettings,
    #[validate(nested)]
    pub enrich: EnrichSettings,
    #[validate(nested)]
    pub clustering: ClusteringSettings,
    #[validate(nested)]
    pub merge: MergeSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Process locality groups on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EnrichSettings {
    /// GeoNames-style `lat,lon,name,admin1,admin2,cc` file
    #[serde(default = "default_gazetteer_path")]
    #[validate(length(min = 1))]
    pub gazetteer_path: String,
    /// `Name,Postal Code,FIPS` file; the built-in U.S. table when absent
    #[serde(default)]
    pub region_table_path: Option<String>,
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            gazetteer_path: default_gazetteer_path(),
            region_table_path: None,
            drop_columns: default_drop_columns(),
        }
    }
}

fn default_gazetteer_path() -> String { "data/rg_cities1000.csv".to_string() }
fn default_drop_columns() -> Vec<String> {
    DEFAULT_DROP_COLUMNS.iter().map(|column| column.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClusteringSettings {
    #[serde(default = "default_distance_threshold")]
    #[validate(range(exclusive_min = 0.0))]
    pub distance_threshold: f64,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    #[validate(nested)]
    pub embedder: EmbedderSettings,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            linkage: Linkage::default(),
            embedder: EmbedderSettings::default(),
        }
    }
}

fn default_distance_threshold() -> f64 { DEFAULT_DISTANCE_THRESHOLD }

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ngram_range"))]
pub struct EmbedderSettings {
    /// Pretrained n-gram table; feature hashing when absent
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default = "default_dimension")]
    #[validate(range(min = 1))]
    pub dimension: usize,
    #[serde(default = "default_ngram_min")]
    #[validate(range(min = 1))]
    pub ngram_min: usize,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            dimension: default_dimension(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
        }
    }
}

fn default_dimension() -> usize { DEFAULT_DIMENSION }
fn default_ngram_min() -> usize { DEFAULT_NGRAM_MIN }
fn default_ngram_max() -> usize { DEFAULT_NGRAM_MAX }

fn validate_ngram_range(settings: &EmbedderSettings) -> Result<(), ValidationError> {
    if settings.ngram_min > settings.ngram_max {
        return Err(ValidationError::new("ngram_range"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MergeSettings {
    #[serde(default = "default_proximity_threshold_km")]
    #[validate(range(exclusive_min = 0.0))]
    pub proximity_threshold_km: f64,
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            proximity_threshold_km: default_proximity_threshold_km(),
            metric: DistanceMetric::default(),
        }
    }
}

fn default_proximity_threshold_km() -> f64 { DEFAULT_PROXIMITY_THRESHOLD_KM }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn environment() -> Environment {
    // e.g., DEDUP__MERGE__PROXIMITY_THRESHOLD_KM -> merge.proximity_threshold_km
    Environment::with_prefix("DEDUP")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DEDUP__)
    pub fn load() -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }
}
