//! Error types for the HTTP client layer
//!
//! HTTP 4xx/5xx statuses are not errors here: they come back as normal
//! [`ApiResponse`](crate::ApiResponse) values for the caller to assert on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Session client used before init() or after dispose()")]
    NotInitialized,

    #[error("Authentication token not found for key '{key}'. Call authenticate() first")]
    TokenNotFound { key: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("GraphQL batch is full (max {max} requests)")]
    BatchFull { max: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
