//! Environment resolution
//!
//! Resolves the settings for one named deployment target (`testing`,
//! `staging`, `production`, ...) from layered sources merged with figment.
//! Later layers win, and empty values never shadow earlier ones:
//!
//! 1. hard-coded defaults
//! 2. `.env` in the config directory
//! 3. `.env.<name>` in the config directory
//! 4. process environment variables
//!
//! Resolution never fails. Missing files are logged and skipped, and
//! unparseable numbers fall back to their defaults.

use figment::providers::Serialized;
use figment::value::{Dict, Map, Value};
use figment::{Figment, Metadata, Profile, Provider};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Variable selecting the environment name
pub const ENV_NAME_VAR: &str = "TEST_ENV";

/// Environment used when nothing selects one
pub const DEFAULT_ENV_NAME: &str = "testing";

/// Vendor flags whose presence means we are running in CI
pub const CI_FLAGS: [&str; 4] = ["CI", "GITHUB_ACTIONS", "JENKINS_URL", "GITLAB_CI"];

pub const DEFAULT_BASE_URL: &str = "https://www.saucedemo.com";
pub const DEFAULT_BOOKING_API_URL: &str = "https://restful-booker.herokuapp.com";
pub const DEFAULT_OBJECTS_API_URL: &str = "https://api.restful-api.dev";
pub const DEFAULT_GRAPHQL_URL: &str = "https://countries.trevorblades.com/graphql";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password123";
pub const DEFAULT_REPORT_DIR: &str = "test-results";
pub const DEFAULT_HTML_REPORT_DIR: &str = "playwright-report";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Keys read from env files and the process environment
pub const SETTING_KEYS: [&str; 15] = [
    "BASE_URL",
    "BOOKING_API_URL",
    "OBJECTS_API_URL",
    "OBJECTS_API_KEY",
    "GRAPHQL_URL",
    "TIMEOUT",
    "EXPECT_TIMEOUT",
    "RETRIES",
    "WORKERS",
    "APP_USERNAME",
    "APP_PASSWORD",
    "HEADLESS",
    "REPORT_DIR",
    "HTML_REPORT_DIR",
    "LOG_LEVEL",
];

static GLOBAL: OnceCell<EnvironmentConfig> = OnceCell::new();

/// Source of process-level variables
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Service a URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Ui,
    Booking,
    Objects,
    Graphql,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::Ui, Target::Booking, Target::Objects, Target::Graphql];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Ui => "ui",
            Target::Booking => "booking",
            Target::Objects => "objects",
            Target::Graphql => "graphql",
        }
    }
}

/// Login credentials for the application under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Credentials {
    /// Password with everything but its length hidden
    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count().min(8))
    }
}

/// Where test reports are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPaths {
    pub output_dir: PathBuf,
    pub html_report_dir: PathBuf,
}

impl ReportPaths {
    /// JSON results file inside the output directory
    pub fn results_file(&self) -> PathBuf {
        self.output_dir.join("test-results.json")
    }
}

/// A non-fatal problem found in a resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Resolved settings for one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentConfig {
    /// Environment name (`testing`, `staging`, ...)
    pub name: String,

    /// UI application base URL
    pub base_url: String,

    /// Booking service base URL
    pub booking_api_url: String,

    /// Device-object service base URL
    pub objects_api_url: String,

    /// Optional API key for the device-object service
    #[serde(skip_serializing)]
    pub objects_api_key: Option<String>,

    /// GraphQL endpoint
    pub graphql_url: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Assertion polling timeout in milliseconds
    pub expect_timeout_ms: u64,

    /// Retry count handed to the test harness
    pub retries: u32,

    /// Parallel worker count
    pub workers: usize,

    pub credentials: Credentials,

    pub reports: ReportPaths,

    /// Run browsers without a window
    pub headless: bool,

    /// Any CI vendor flag was present
    pub is_ci: bool,

    /// Default tracing filter
    pub log_level: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENV_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            booking_api_url: DEFAULT_BOOKING_API_URL.to_string(),
            objects_api_url: DEFAULT_OBJECTS_API_URL.to_string(),
            objects_api_key: None,
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            retries: 0,
            workers: DEFAULT_WORKERS,
            credentials: Credentials {
                username: DEFAULT_USERNAME.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
            },
            reports: ReportPaths {
                output_dir: PathBuf::from(DEFAULT_REPORT_DIR),
                html_report_dir: PathBuf::from(DEFAULT_HTML_REPORT_DIR),
            },
            headless: true,
            is_ci: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Settings as strings, before numbers and flags are parsed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawSettings {
    base_url: String,
    booking_api_url: String,
    objects_api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    objects_api_key: Option<String>,
    graphql_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expect_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retries: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workers: Option<String>,
    app_username: String,
    app_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    headless: Option<String>,
    report_dir: String,
    html_report_dir: String,
    log_level: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            booking_api_url: DEFAULT_BOOKING_API_URL.to_string(),
            objects_api_url: DEFAULT_OBJECTS_API_URL.to_string(),
            objects_api_key: None,
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            timeout: None,
            expect_timeout: None,
            retries: None,
            workers: None,
            app_username: DEFAULT_USERNAME.to_string(),
            app_password: DEFAULT_PASSWORD.to_string(),
            headless: None,
            report_dir: DEFAULT_REPORT_DIR.to_string(),
            html_report_dir: DEFAULT_HTML_REPORT_DIR.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// A named set of `KEY=value` pairs merged as one figment layer.
///
/// Only [`SETTING_KEYS`] with non-empty values are provided.
struct VarsLayer {
    name: String,
    vars: Vec<(String, String)>,
}

impl VarsLayer {
    /// Read a dotenv file, skipping lines that do not parse
    fn from_file(path: &Path) -> Result<Self> {
        let mut vars = Vec::new();
        for item in dotenvy::from_path_iter(path)? {
            match item {
                Ok(pair) => vars.push(pair),
                Err(e) => debug!("Skipping line in {}: {}", path.display(), e),
            }
        }
        Ok(Self {
            name: path.display().to_string(),
            vars,
        })
    }

    fn from_source(env: &dyn EnvSource) -> Self {
        let vars = SETTING_KEYS
            .iter()
            .filter_map(|key| env.var(key).map(|value| (key.to_string(), value)))
            .collect();
        Self {
            name: "process environment".to_string(),
            vars,
        }
    }
}

impl Provider for VarsLayer {
    fn metadata(&self) -> Metadata {
        Metadata::named(self.name.clone())
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        let dict: Dict = self
            .vars
            .iter()
            .filter(|(key, value)| SETTING_KEYS.contains(&key.as_str()) && !value.trim().is_empty())
            .map(|(key, value)| (key.to_ascii_lowercase(), Value::from(value.clone())))
            .collect();
        Ok(Profile::Default.collect(dict))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn extract_settings(figment: &Figment) -> Result<RawSettings> {
    figment.extract().map_err(|e| Error::Config(Box::new(e)))
}

impl EnvironmentConfig {
    /// Process-wide configuration, resolved on first access
    pub fn global() -> &'static EnvironmentConfig {
        GLOBAL.get_or_init(|| Self::resolve(None))
    }

    /// Resolve from the working directory and the process environment
    pub fn resolve(name: Option<&str>) -> Self {
        Self::resolve_in(name, Path::new("."), &ProcessEnv)
    }

    /// Resolve from an explicit config directory and variable source
    pub fn resolve_in(name: Option<&str>, config_dir: &Path, env: &dyn EnvSource) -> Self {
        let name = name
            .map(str::to_string)
            .or_else(|| non_empty(env.var(ENV_NAME_VAR)))
            .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string());

        let fallback_path = config_dir.join(".env");
        let specific_path = config_dir.join(format!(".env.{}", name));

        let mut figment = Figment::new().merge(Serialized::defaults(RawSettings::default()));

        match VarsLayer::from_file(&fallback_path) {
            Ok(layer) => {
                debug!("Loaded {} values from {}", layer.vars.len(), fallback_path.display());
                figment = figment.merge(layer);
            }
            Err(e) => debug!("No {} ({})", fallback_path.display(), e),
        }

        match VarsLayer::from_file(&specific_path) {
            Ok(layer) => {
                debug!("Loaded {} values from {}", layer.vars.len(), specific_path.display());
                figment = figment.merge(layer);
            }
            Err(e) => warn!(
                "Could not load {} ({}), falling back to {}",
                specific_path.display(),
                e,
                fallback_path.display()
            ),
        }

        let figment = figment.merge(VarsLayer::from_source(env));
        let raw = extract_settings(&figment).unwrap_or_else(|e| {
            warn!("Settings could not be extracted ({}), using defaults", e);
            RawSettings::default()
        });

        let is_ci = detect_ci(env);

        let config = Self {
            timeout_ms: parse_number("TIMEOUT", raw.timeout.as_deref(), DEFAULT_TIMEOUT_MS),
            expect_timeout_ms: parse_number(
                "EXPECT_TIMEOUT",
                raw.expect_timeout.as_deref(),
                DEFAULT_EXPECT_TIMEOUT_MS,
            ),
            retries: parse_number("RETRIES", raw.retries.as_deref(), if is_ci { 2 } else { 0 }),
            workers: parse_workers(raw.workers.as_deref(), is_ci, available_cpus()),
            headless: parse_bool(raw.headless.as_deref()).unwrap_or(true),
            base_url: raw.base_url,
            booking_api_url: raw.booking_api_url,
            objects_api_url: raw.objects_api_url,
            objects_api_key: raw.objects_api_key,
            graphql_url: raw.graphql_url,
            credentials: Credentials {
                username: raw.app_username,
                password: raw.app_password,
            },
            reports: ReportPaths {
                output_dir: PathBuf::from(raw.report_dir),
                html_report_dir: PathBuf::from(raw.html_report_dir),
            },
            is_ci,
            log_level: raw.log_level,
            name,
        };

        config.log_summary();
        config
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn expect_timeout(&self) -> Duration {
        Duration::from_millis(self.expect_timeout_ms)
    }

    /// Copy of this config with a different request timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ..self.clone()
        }
    }

    /// Base URL for a service
    pub fn url_for(&self, target: Target) -> &str {
        match target {
            Target::Ui => &self.base_url,
            Target::Booking => &self.booking_api_url,
            Target::Objects => &self.objects_api_url,
            Target::Graphql => &self.graphql_url,
        }
    }

    /// Collect suspicious values. Never fails.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for target in Target::ALL {
            let url = self.url_for(target);
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(ConfigWarning {
                    field: target.as_str(),
                    message: format!("'{}' is not an http(s) URL", url),
                });
            }
        }

        if self.timeout_ms == 0 {
            warnings.push(ConfigWarning {
                field: "timeout",
                message: "timeout of 0 ms fails every request".to_string(),
            });
        }

        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            warnings.push(ConfigWarning {
                field: "credentials",
                message: "username or password is empty".to_string(),
            });
        }

        warnings
    }

    fn log_summary(&self) {
        info!("Environment '{}' resolved (ci: {})", self.name, self.is_ci);
        for line in self.to_string().lines().skip(1) {
            info!("{}", line);
        }
    }
}

impl fmt::Display for EnvironmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Environment: {}", self.name)?;
        writeln!(f, "  Base URL:        {}", self.base_url)?;
        writeln!(f, "  Booking API:     {}", self.booking_api_url)?;
        writeln!(f, "  Objects API:     {}", self.objects_api_url)?;
        writeln!(f, "  GraphQL:         {}", self.graphql_url)?;
        writeln!(f, "  Timeout:         {} ms", self.timeout_ms)?;
        writeln!(f, "  Expect timeout:  {} ms", self.expect_timeout_ms)?;
        writeln!(f, "  Retries:         {}", self.retries)?;
        writeln!(f, "  Workers:         {}", self.workers)?;
        writeln!(
            f,
            "  Credentials:     {} / {}",
            self.credentials.username,
            self.credentials.masked_password()
        )?;
        writeln!(f, "  Reports:         {}", self.reports.output_dir.display())?;
        writeln!(f, "  HTML report:     {}", self.reports.html_report_dir.display())?;
        writeln!(f, "  Headless:        {}", self.headless)?;
        write!(f, "  CI:              {}", self.is_ci)
    }
}

/// True when any CI vendor flag is set to something truthy
pub fn detect_ci(env: &dyn EnvSource) -> bool {
    CI_FLAGS.iter().any(|flag| {
        non_empty(env.var(flag))
            .map(|v| parse_bool(Some(&v)).unwrap_or(true))
            .unwrap_or(false)
    })
}

fn parse_number<T: std::str::FromStr + Copy + fmt::Display>(key: &str, raw: Option<&str>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}='{}' is not a number, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// Worker count from a raw setting.
///
/// Positive integers are taken as-is. `auto` means half the logical CPUs and
/// `N%` means that share of them, never less than one and never more than
/// all of them. Anything else, or no value, gives the fixed default.
pub fn parse_workers(raw: Option<&str>, is_ci: bool, cpus: usize) -> usize {
    let fixed = if is_ci { 1 } else { DEFAULT_WORKERS };
    let Some(raw) = raw.map(str::trim) else {
        return fixed;
    };

    if let Ok(n) = raw.parse::<usize>() {
        if n > 0 {
            return n;
        }
    }

    if raw.eq_ignore_ascii_case("auto") {
        return (cpus / 2).max(1);
    }

    if let Some(pct) = raw.strip_suffix('%').and_then(|p| p.trim().parse::<usize>().ok()) {
        if pct > 0 {
            return (cpus.saturating_mul(pct.min(100)) / 100).clamp(1, cpus.max(1));
        }
    }

    warn!("WORKERS='{}' is not usable, using {}", raw, fixed);
    fixed
}

fn parse_bool(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_defaults_when_nothing_present() {
        let dir = TempDir::new().unwrap();
        let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[]));

        assert_eq!(config.name, "testing");
        assert_eq!(config.booking_api_url, DEFAULT_BOOKING_API_URL);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.retries, 0);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert!(!config.is_ci);
        assert!(config.headless);
    }

    #[test]
    fn test_process_env_beats_env_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env.testing", "TIMEOUT=30000\n");

        let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[("TIMEOUT", "99999")]));
        assert_eq!(config.timeout_ms, 99_999);
    }

    #[test]
    fn test_specific_file_beats_default_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env.staging", "BASE_URL=https://staging.example.com\n");
        write(&dir, ".env", "BASE_URL=https://default.example.com\nRETRIES=5\n");

        let config = EnvironmentConfig::resolve_in(Some("staging"), dir.path(), &vars(&[]));
        assert_eq!(config.name, "staging");
        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.retries, 5);
    }

    #[test]
    fn test_missing_specific_file_uses_default_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env", "APP_USERNAME=tester\n");

        let config = EnvironmentConfig::resolve_in(Some("production"), dir.path(), &vars(&[]));
        assert_eq!(config.credentials.username, "tester");
        assert_eq!(config.credentials.password, DEFAULT_PASSWORD);
    }

    #[test]
    fn test_os_login_name_does_not_replace_credentials() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env.testing", "APP_USERNAME=admin\nAPP_PASSWORD=secret\n");

        let env = vars(&[("USERNAME", "jdoe"), ("PASSWORD", "hunter2")]);
        let config = EnvironmentConfig::resolve_in(None, dir.path(), &env);
        assert_eq!(config.credentials.username, "admin");
        assert_eq!(config.credentials.password, "secret");

        let env = vars(&[("APP_USERNAME", "ci-bot")]);
        let config = EnvironmentConfig::resolve_in(None, dir.path(), &env);
        assert_eq!(config.credentials.username, "ci-bot");
    }

    #[test]
    fn test_layers_merge_per_key() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env", "BASE_URL=https://default.example.com\nRETRIES=1\nWORKERS=3\n");
        write(&dir, ".env.staging", "RETRIES=4\nLOG_LEVEL=debug\n");

        let env = vars(&[("LOG_LEVEL", "trace"), ("UNRELATED", "x")]);
        let config = EnvironmentConfig::resolve_in(Some("staging"), dir.path(), &env);
        assert_eq!(config.base_url, "https://default.example.com");
        assert_eq!(config.retries, 4);
        assert_eq!(config.workers, 3);
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.booking_api_url, DEFAULT_BOOKING_API_URL);
    }

    #[test]
    fn test_env_file_syntax() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            ".env.testing",
            "# comment\n\nexport RETRIES=3\nAPP_PASSWORD=\"p#ss word\"\nREPORT_DIR='out dir'\n",
        );

        let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[]));
        assert_eq!(config.retries, 3);
        assert_eq!(config.credentials.password, "p#ss word");
        assert_eq!(config.reports.output_dir, PathBuf::from("out dir"));
    }

    #[test]
    fn test_env_name_from_variable() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env.staging", "GRAPHQL_URL=https://gql.staging/graphql\n");

        let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[(ENV_NAME_VAR, "staging")]));
        assert_eq!(config.name, "staging");
        assert_eq!(config.graphql_url, "https://gql.staging/graphql");
    }

    #[test]
    fn test_explicit_name_beats_variable() {
        let dir = TempDir::new().unwrap();
        let config = EnvironmentConfig::resolve_in(
            Some("production"),
            dir.path(),
            &vars(&[(ENV_NAME_VAR, "staging")]),
        );
        assert_eq!(config.name, "production");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env.testing", "TIMEOUT=soon\nRETRIES=-1\n");

        let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[]));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.retries, 0);
    }

    #[test]
    fn test_empty_env_value_does_not_shadow_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".env.testing", "BASE_URL=https://file.example.com\n");

        let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[("BASE_URL", "")]));
        assert_eq!(config.base_url, "https://file.example.com");
    }

    #[test]
    fn test_ci_detection_and_ci_defaults() {
        let dir = TempDir::new().unwrap();
        for flag in CI_FLAGS {
            let config = EnvironmentConfig::resolve_in(None, dir.path(), &vars(&[(flag, "true")]));
            assert!(config.is_ci, "{} should mark CI", flag);
            assert_eq!(config.retries, 2);
            assert_eq!(config.workers, 1);
        }

        assert!(!detect_ci(&vars(&[("CI", "false")])));
        assert!(detect_ci(&vars(&[("JENKINS_URL", "http://jenkins.local")])));
    }

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers(Some("3"), false, 8), 3);
        assert_eq!(parse_workers(Some("auto"), false, 8), 4);
        assert_eq!(parse_workers(Some("AUTO"), false, 1), 1);
        assert_eq!(parse_workers(Some("25%"), false, 8), 2);
        assert_eq!(parse_workers(Some("10%"), false, 4), 1);
        assert_eq!(parse_workers(Some("lots"), false, 8), DEFAULT_WORKERS);
        assert_eq!(parse_workers(Some("0"), true, 8), 1);
        assert_eq!(parse_workers(None, false, 8), DEFAULT_WORKERS);
        assert_eq!(parse_workers(Some("9223372036854775807%"), false, 8), 8);
        assert_eq!(parse_workers(Some("250%"), false, 4), 4);
        assert_eq!(parse_workers(Some("50%"), false, 0), 1);
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let config = EnvironmentConfig {
            graphql_url: "countries".to_string(),
            timeout_ms: 0,
            ..Default::default()
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.field == "graphql"));
        assert!(warnings.iter().any(|w| w.field == "timeout"));
        assert!(EnvironmentConfig::default().validate().is_empty());
    }

    #[test]
    fn test_with_timeout_leaves_original() {
        let config = EnvironmentConfig::default();
        let short = config.with_timeout(Duration::from_secs(2));
        assert_eq!(short.timeout_ms, 2_000);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);

        let forever = config.with_timeout(Duration::MAX);
        assert_eq!(forever.timeout_ms, u64::MAX);
    }

    #[test]
    fn test_display_masks_password() {
        let config = EnvironmentConfig::default();
        let rendered = config.to_string();
        assert!(rendered.contains("admin / ********"));
        assert!(!rendered.contains(DEFAULT_PASSWORD));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains(DEFAULT_PASSWORD));
    }
}
