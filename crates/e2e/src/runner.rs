//! Scenario runner: executes API scenarios against the resolved environment

use chrono::{DateTime, Utc};
use qakit_client::{
    ApiResponse, BookingService, GraphQLRequest, GraphQLResponse, RequestOptions, SessionClient, SessionOptions,
    TokenStore,
};
use qakit_common::EnvironmentConfig;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{E2eError, E2eResult};
use crate::scenario::{capture_value, substitute, substitute_json, ApiScenario, ApiStep, Expectation, ServiceRef, Variables};

/// Result of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    /// HTTP status when the step sent a request
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: Uuid,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs scenarios one after another; steps within a scenario stop at the
/// first failure
pub struct ScenarioRunner {
    config: EnvironmentConfig,
    scenarios_dir: PathBuf,
    output_dir: PathBuf,
}

impl ScenarioRunner {
    pub fn new(config: EnvironmentConfig) -> Self {
        let output_dir = config.reports.output_dir.clone();
        Self {
            config,
            scenarios_dir: PathBuf::from("tests/scenarios"),
            output_dir,
        }
    }

    pub fn with_scenarios_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scenarios_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Run every scenario in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let scenarios = ApiScenario::load_all(&self.scenarios_dir)?;
        Ok(self.run_scenarios(&scenarios).await)
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = ApiScenario::load_all(&self.scenarios_dir)?;
        let filtered: Vec<ApiScenario> = ApiScenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        Ok(self.run_scenarios(&filtered).await)
    }

    /// Run a single scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<ScenarioResult> {
        let scenario = ApiScenario::load_all(&self.scenarios_dir)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))?;
        Ok(self.run_scenario(&scenario).await)
    }

    pub async fn run_scenarios(&self, scenarios: &[ApiScenario]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);

        info!("Running {} scenario(s) against '{}'", scenarios.len(), self.config.name);

        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.skipped {
                skipped += 1;
                info!("- {} (skipped)", result.name);
            } else if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenario results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteResult {
            run_id: Uuid::new_v4(),
            environment: self.config.name.clone(),
            started_at,
            total: scenarios.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Run one scenario with its own token store and variables
    pub async fn run_scenario(&self, scenario: &ApiScenario) -> ScenarioResult {
        if scenario.skip {
            return ScenarioResult {
                name: scenario.name.clone(),
                success: true,
                skipped: true,
                duration_ms: 0,
                steps: Vec::new(),
                error: None,
            };
        }

        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut steps = Vec::new();
        let mut scenario_error = None;

        match ScenarioContext::new(&self.config, scenario) {
            Ok(mut ctx) => {
                for step in &scenario.steps {
                    let result = ctx.execute(step).await;
                    let failed = !result.success;
                    if failed {
                        scenario_error = result.error.clone();
                    }
                    steps.push(result);
                    if failed {
                        break;
                    }
                }
                ctx.session.dispose();
            }
            Err(e) => scenario_error = Some(e.to_string()),
        }

        ScenarioResult {
            name: scenario.name.clone(),
            success: scenario_error.is_none(),
            skipped: false,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: scenario_error,
        }
    }

    /// Write `test-results.json` into the output directory
    pub fn write_results(&self, result: &SuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, result)
    }
}

pub const RESULTS_FILE: &str = "test-results.json";

/// Write a suite result as pretty JSON under `dir`
pub fn write_results(dir: &Path, result: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(RESULTS_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(result)?)?;
    info!("Results written to: {}", path.display());
    Ok(path)
}

/// A step error and the HTTP status seen before it, if any
type StepFailure = (Option<u16>, E2eError);

fn at<E: Into<E2eError>>(status: Option<u16>) -> impl FnOnce(E) -> StepFailure {
    move |e| (status, e.into())
}

/// Per-scenario state
struct ScenarioContext<'a> {
    config: &'a EnvironmentConfig,
    base_url: String,
    session: SessionClient,
    tokens: TokenStore,
    vars: Variables,
}

impl<'a> ScenarioContext<'a> {
    fn new(config: &'a EnvironmentConfig, scenario: &ApiScenario) -> E2eResult<Self> {
        let base_url = match &scenario.service {
            ServiceRef::Named(target) => config.url_for(*target).to_string(),
            ServiceRef::Url { url } => url.clone(),
        };
        let options = SessionOptions::new(base_url.clone())
            .with_timeout(config.timeout())
            .with_auth(scenario.auth.clone());

        Ok(Self {
            config,
            session: SessionClient::connect(options)?,
            base_url,
            tokens: TokenStore::new(),
            vars: Variables::new(),
        })
    }

    async fn execute(&mut self, step: &ApiStep) -> StepResult {
        let start = Instant::now();
        let name = step.name();
        let outcome = self.execute_inner(step).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(status) => StepResult {
                step: name,
                success: true,
                duration_ms,
                status,
                error: None,
            },
            Err((status, e)) => StepResult {
                step: name,
                success: false,
                duration_ms,
                status,
                error: Some(e.to_string()),
            },
        }
    }

    async fn execute_inner(&mut self, step: &ApiStep) -> Result<Option<u16>, StepFailure> {
        match step {
            ApiStep::Request {
                method,
                path,
                json,
                headers,
                query,
                expect,
                capture,
            } => {
                let method = Method::from_bytes(method.to_uppercase().as_bytes())
                    .map_err(|e| E2eError::SpecParse(format!("invalid method '{}': {}", method, e)))
                    .map_err(at(None))?;
                let options = self.request_options(json.as_ref(), headers, query).map_err(at(None))?;
                let path = substitute(path, &self.vars).map_err(at(None))?;

                let response = self
                    .session
                    .request(method, &path, options)
                    .await
                    .map_err(at(None))?;
                let status = Some(response.status_code());
                self.check(&response, expect.as_ref(), capture, None).map_err(at(status))?;
                Ok(status)
            }

            ApiStep::Authenticate { username, password } => {
                let username = username.as_deref().unwrap_or(&self.config.credentials.username);
                let password = password.as_deref().unwrap_or(&self.config.credentials.password);
                let options = SessionOptions::new(self.base_url.clone()).with_timeout(self.config.timeout());

                let mut booking = BookingService::new(options, self.tokens.clone()).map_err(at(None))?;
                let token = booking
                    .authenticate(username, password)
                    .await
                    .map_err(at(None))?;
                booking.dispose();

                self.vars.insert("token".to_string(), token.into_inner());
                Ok(None)
            }

            ApiStep::Graphql {
                query,
                variables,
                operation_name,
                path,
                allow_errors,
                expect,
                capture,
            } => {
                let mut request = GraphQLRequest::new(query.clone());
                if let Some(variables) = variables {
                    request = request.with_variables(substitute_json(variables, &self.vars).map_err(at(None))?);
                }
                if let Some(name) = operation_name {
                    request = request.with_operation_name(name.clone());
                }

                let options = RequestOptions::json_of(&request).map_err(at(None))?;
                let response = self
                    .session
                    .post(path.as_deref().unwrap_or(""), options)
                    .await
                    .map_err(at(None))?;
                let status = Some(response.status_code());

                let parsed: GraphQLResponse = response.json().map_err(at(status))?;
                if parsed.has_errors() && !allow_errors {
                    return Err((
                        status,
                        E2eError::AssertionFailed(format!(
                            "GraphQL errors: {}",
                            parsed.error_messages().join("; ")
                        )),
                    ));
                }

                // Captures are relative to `data`
                self.check(&response, expect.as_ref(), capture, Some("data"))
                    .map_err(at(status))?;
                Ok(status)
            }

            ApiStep::Log { message } => {
                info!("[scenario] {}", substitute(message, &self.vars).unwrap_or_else(|_| message.clone()));
                Ok(None)
            }
        }
    }

    fn request_options(
        &self,
        json: Option<&serde_json::Value>,
        headers: &std::collections::BTreeMap<String, String>,
        query: &std::collections::BTreeMap<String, String>,
    ) -> E2eResult<RequestOptions> {
        let mut options = RequestOptions::new();
        if let Some(body) = json {
            options = options.json(substitute_json(body, &self.vars)?);
        }
        for (name, value) in headers {
            options = options.header(name.clone(), substitute(value, &self.vars)?);
        }
        for (name, value) in query {
            options = options.query(name.clone(), substitute(value, &self.vars)?);
        }
        Ok(options)
    }

    /// Verify expectations, then store captures
    fn check(
        &mut self,
        response: &ApiResponse,
        expect: Option<&Expectation>,
        capture: &std::collections::BTreeMap<String, String>,
        root: Option<&str>,
    ) -> E2eResult<()> {
        if let Some(expect) = expect {
            expect
                .verify(response)
                .map_err(|failure| E2eError::AssertionFailed(failure.to_string()))?;
        }

        for (var, path) in capture {
            let full_path = match root {
                Some(root) if !path.is_empty() => format!("{}.{}", root, path),
                Some(root) => root.to_string(),
                None => path.clone(),
            };
            let value = response.extract(&full_path).ok_or_else(|| E2eError::StepFailed {
                step: format!("capture {}", var),
                reason: format!("no value at '{}'", full_path),
            })?;
            debug!("Captured {} from {}", var, full_path);
            self.vars.insert(var.clone(), capture_value(value));
        }
        Ok(())
    }
}
