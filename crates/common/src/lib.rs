//! QAKit Common Library
//!
//! Shared error types and environment resolution used by the QAKit
//! clients, scenario runner and CLI.

pub mod env;
pub mod error;

pub use env::{ConfigWarning, Credentials, EnvSource, EnvironmentConfig, ProcessEnv, ReportPaths, Target};
pub use error::{Error, Result};

/// QAKit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
