//! HTTP session client
//!
//! A [`SessionClient`] owns one `reqwest::Client` bound to a base URL and an
//! authentication scheme. It must be initialized before the first request and
//! can be disposed afterwards; requests outside that window fail with
//! [`ClientError::NotInitialized`]. No retries happen here.

use qakit_common::{EnvironmentConfig, Target};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::auth::{header_name, header_value, AuthConfig};
use crate::error::{ClientError, ClientResult};
use crate::response::ApiResponse;
use crate::token::TokenStore;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub base_url: String,
    pub auth: AuthConfig,
    pub timeout: Duration,
    /// Headers sent with every request, after the auth headers
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
}

impl SessionOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthConfig::None,
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
            user_agent: format!("qakit/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Options for one of the configured services, inheriting its timeout
    pub fn from_env(config: &EnvironmentConfig, target: Target) -> Self {
        Self::new(config.url_for(target)).with_timeout(config.timeout())
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Per-request additions
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub json: Option<Value>,
    pub form: Option<Vec<(String, String)>>,
    pub body: Option<String>,
    pub query: Vec<(String, String)>,
    /// Merged over the session headers; these win on conflicts
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Serialize any value as the JSON body
    pub fn json_of<T: Serialize>(body: &T) -> ClientResult<Self> {
        Ok(Self::new().json(serde_json::to_value(body)?))
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.form = Some(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

struct Session {
    http: reqwest::Client,
    base_url: Url,
    headers: HeaderMap,
}

/// HTTP client bound to one base URL and auth scheme
pub struct SessionClient {
    options: SessionOptions,
    session: Option<Session>,
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.options.base_url)
            .field("auth", &self.options.auth.scheme())
            .field("timeout", &self.options.timeout)
            .field("initialized", &self.session.is_some())
            .finish()
    }
}

impl SessionClient {
    pub fn new(options: SessionOptions) -> Self {
        Self { options, session: None }
    }

    /// Construct and initialize in one step
    pub fn connect(options: SessionOptions) -> ClientResult<Self> {
        let mut client = Self::new(options);
        client.init()?;
        Ok(client)
    }

    /// Bearer client using a token saved earlier under `key`
    pub fn with_stored_token(options: SessionOptions, store: &TokenStore, key: &str) -> ClientResult<Self> {
        let token = store
            .get_token(key)
            .ok_or_else(|| ClientError::TokenNotFound { key: key.to_string() })?;
        Self::connect(options.with_auth(AuthConfig::bearer(token)))
    }

    pub fn session_options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn base_url(&self) -> &str {
        &self.options.base_url
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Build the underlying client. A second call is a no-op.
    ///
    /// Fails on a malformed base URL or header; credentials are not checked.
    pub fn init(&mut self) -> ClientResult<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let base_url = Url::parse(&self.options.base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: self.options.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = self.options.auth.headers()?;
        for (name, value) in &self.options.headers {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }

        let http = reqwest::Client::builder()
            .timeout(self.options.timeout)
            .user_agent(self.options.user_agent.as_str())
            .build()?;

        debug!(
            "Session initialized for {} (auth: {}, timeout: {:?})",
            base_url,
            self.options.auth.scheme(),
            self.options.timeout
        );

        self.session = Some(Session { http, base_url, headers });
        Ok(())
    }

    /// Release the underlying client. Safe to call at any time.
    pub fn dispose(&mut self) {
        if self.session.take().is_some() {
            debug!("Session disposed for {}", self.options.base_url);
        }
    }

    /// Headers every request carries
    pub fn session_headers(&self) -> ClientResult<&HeaderMap> {
        Ok(&self.session()?.headers)
    }

    /// Absolute URL for a request path
    pub fn url_for(&self, path: &str) -> ClientResult<String> {
        Ok(join_url(&self.session()?.base_url, path))
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::GET, path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::POST, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::PUT, path, options).await
    }

    pub async fn patch(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::PATCH, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::DELETE, path, options).await
    }

    pub async fn head(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::HEAD, path, options).await
    }

    pub async fn options(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::OPTIONS, path, options).await
    }

    /// Send one request. HTTP error statuses are returned, not raised.
    pub async fn request(&self, method: Method, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        let session = self.session()?;
        let url = join_url(&session.base_url, path);
        let headers = merge_headers(&session.headers, &options.headers)?;

        let mut builder = session.http.request(method.clone(), &url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(json) = &options.json {
            builder = builder.json(json);
        } else if let Some(form) = &options.form {
            builder = builder.form(form);
        } else if let Some(body) = options.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let response = ApiResponse::from_reqwest(response, started).await?;

        debug!(
            "{} {} -> {} ({} ms)",
            method,
            url,
            response.status_code(),
            response.elapsed().as_millis()
        );
        Ok(response)
    }

    fn session(&self) -> ClientResult<&Session> {
        self.session.as_ref().ok_or(ClientError::NotInitialized)
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if self.session.is_some() {
            debug!("Session for {} dropped without dispose()", self.options.base_url);
        }
    }
}

/// Session headers with per-call headers laid over them
pub fn merge_headers(session: &HeaderMap, per_call: &BTreeMap<String, String>) -> ClientResult<HeaderMap> {
    let mut merged = session.clone();
    for (name, value) in per_call {
        merged.insert(header_name(name)?, header_value(name, value)?);
    }
    Ok(merged)
}

/// Resolve a request path against the base URL.
///
/// Absolute `http(s)://` paths are used as given. Anything else is appended
/// to the base, so a base of `https://host/api` keeps its `/api` prefix.
pub fn join_url(base: &Url, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}
