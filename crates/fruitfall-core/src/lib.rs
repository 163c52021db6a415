pub mod app_config;
pub mod config;
pub mod feature;
pub mod ingest;

pub use app_config::{AppConfig, Environment, HomeView};
pub use config::{load_app_config, load_app_config_from_env};
pub use feature::{Feature, FeatureCollection, FeatureId, FeatureInput, LngLat, Properties};
pub use ingest::{parse_feature, parse_feature_collection, DropReason, DroppedRecord, GeoJsonError};

use thiserror::Error;

/// Errors produced while loading application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
