//! Error types for QAKit

use thiserror::Error;

/// Result type alias using QAKit Error
pub type Result<T> = std::result::Result<T, Error>;

/// QAKit common error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Env file error: {0}")]
    EnvFile(#[from] dotenvy::Error),
}
