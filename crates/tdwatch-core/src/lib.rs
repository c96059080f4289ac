pub mod app_config;
pub mod config;
pub mod domain;
pub mod politicians;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use domain::{AnalyzerMode, IdeologyDimension, RatingDimension, TopicCategory, RATING_BASELINE};
pub use politicians::{load_politicians, parse_politicians, PoliticianConfig, PoliticiansFile};
pub use sources::{
    load_sources, parse_sources, SourceReliabilityConfig, SourceTier, TierWeights,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read config file {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    FileParse(#[source] serde_yaml::Error),
    #[error("config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind}: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}
