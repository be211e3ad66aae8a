//! QAKit CLI
//!
//! Command-line access to resolved environments and the service clients:
//! inspect configuration, health-check services and make one-off calls.

pub mod commands;
pub mod output;
pub mod logging;
