//! Error types for scenario runs and mock servers

use qakit_client::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Mock server failed to start: {0}")]
    MockServer(String),

    #[error("Invalid route pattern '{pattern}': {reason}")]
    RoutePattern { pattern: String, reason: String },

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Undefined variable: ${{{0}}}")]
    UndefinedVariable(String),

    #[error("Variable ${{{name}}} is '{value}', not a {kind}")]
    PlaceholderType { name: String, kind: String, value: String },

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
