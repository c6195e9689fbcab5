//! Shared configuration, label normalization and domain types for finrag.

pub mod app_config;
pub mod config;
pub mod label;
pub mod types;

use std::path::PathBuf;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use label::{normalize_label, SentimentLabel};
pub use types::{ContextItem, CorpusRecord, Payload, QueryResult};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read secrets file {path}: {source}")]
    SecretsFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse secrets file {path}: {source}")]
    SecretsFileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
