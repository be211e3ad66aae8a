//! QAKit scenario runner and mock servers
//!
//! Runs declarative YAML API scenarios through the client layer, and
//! provides an in-process mock HTTP server for offline runs and tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── run_all() / run_tagged() / run_named()               │
//! │    ├── run_scenario(ApiScenario) -> ScenarioResult          │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ApiScenario (YAML)                                         │
//! │    ├── name, tags, service, auth                            │
//! │    └── steps: [ApiStep]                                     │
//! │          ├── request { method, path, json?, expect? }       │
//! │          ├── authenticate { username?, password? }          │
//! │          ├── graphql { query, variables?, expect? }         │
//! │          └── log { message }                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MockServer: route table -> canned responses, records calls │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fixtures;
pub mod mock;
pub mod runner;
pub mod scenario;

pub use error::{E2eError, E2eResult};
pub use mock::{MockRequest, MockResponse, MockRoute, MockServer};
pub use runner::{ScenarioResult, ScenarioRunner, StepResult, SuiteResult};
pub use scenario::{ApiScenario, ApiStep, Expectation, ServiceRef};
