//! In-process mock HTTP server
//!
//! A [`MockServer`] answers from a table of [`MockRoute`]s: method, path
//! pattern and optional request matchers mapped to a canned response. The
//! first registered route that matches wins. Unmatched requests get a 404
//! with `{"error":"no mock route"}`. Every request is recorded for later
//! inspection.
//!
//! Path patterns are literal segments, `:name` segments matching one path
//! segment, and an optional trailing `*` matching the rest.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Compiled path pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> E2eResult<Self> {
        let invalid = |reason: &str| E2eError::RoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut regex = String::from("^");
        let mut params = Vec::new();
        let segments: Vec<&str> = pattern.trim_start_matches('/').split('/').collect();

        for (i, segment) in segments.iter().enumerate() {
            if *segment == "*" {
                if i != segments.len() - 1 {
                    return Err(invalid("'*' is only allowed as the last segment"));
                }
                regex.push_str("(?:/.*)?");
                continue;
            }

            regex.push('/');
            if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(invalid("parameter names must be alphanumeric"));
                }
                regex.push_str(&format!("(?P<{}>[^/]+)", name));
                params.push(name.to_string());
            } else {
                regex.push_str(&regex::escape(segment));
            }
        }
        regex.push_str("/?$");

        let regex = Regex::new(&regex).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            params,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Captured parameters when `path` matches
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| captures.name(name).map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
enum MockBody {
    Empty,
    Json(Value),
    Text(String),
    /// Send the request body back
    Echo,
}

/// Canned response
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    body: MockBody,
    headers: Vec<(String, String)>,
    delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self::with_body(status, MockBody::Json(body))
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::with_body(status, MockBody::Text(body.into()))
    }

    pub fn empty(status: u16) -> Self {
        Self::with_body(status, MockBody::Empty)
    }

    /// Respond with the request body as JSON
    pub fn echo(status: u16) -> Self {
        Self::with_body(status, MockBody::Echo)
    }

    fn with_body(status: u16, body: MockBody) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn render(&self, request_body: &Bytes) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = Response::builder().status(status);

        let body = match &self.body {
            MockBody::Empty => Body::empty(),
            MockBody::Json(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            MockBody::Text(text) => {
                builder = builder.header(CONTENT_TYPE, "text/plain; charset=utf-8");
                Body::from(text.clone())
            }
            MockBody::Echo => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(request_body.clone())
            }
        };

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(body)
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// One entry of the route table
#[derive(Debug, Clone)]
pub struct MockRoute {
    method: Option<Method>,
    pattern: RoutePattern,
    json_subset: Option<Value>,
    headers: Vec<(String, String)>,
    response: MockResponse,
}

impl MockRoute {
    /// Route for `method` (any method when `None`).
    ///
    /// # Panics
    ///
    /// On an invalid pattern. Use [`MockRoute::try_new`] for untrusted input.
    pub fn new(method: Option<Method>, pattern: &str, response: MockResponse) -> Self {
        match Self::try_new(method, pattern, response) {
            Ok(route) => route,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(method: Option<Method>, pattern: &str, response: MockResponse) -> E2eResult<Self> {
        Ok(Self {
            method,
            pattern: RoutePattern::parse(pattern)?,
            json_subset: None,
            headers: Vec::new(),
            response,
        })
    }

    pub fn get(pattern: &str, response: MockResponse) -> Self {
        Self::new(Some(Method::GET), pattern, response)
    }

    pub fn post(pattern: &str, response: MockResponse) -> Self {
        Self::new(Some(Method::POST), pattern, response)
    }

    pub fn put(pattern: &str, response: MockResponse) -> Self {
        Self::new(Some(Method::PUT), pattern, response)
    }

    pub fn patch(pattern: &str, response: MockResponse) -> Self {
        Self::new(Some(Method::PATCH), pattern, response)
    }

    pub fn delete(pattern: &str, response: MockResponse) -> Self {
        Self::new(Some(Method::DELETE), pattern, response)
    }

    pub fn any(pattern: &str, response: MockResponse) -> Self {
        Self::new(None, pattern, response)
    }

    /// Only match when the JSON body contains every field of `subset`
    pub fn when_json(mut self, subset: Value) -> Self {
        self.json_subset = Some(subset);
        self
    }

    /// Only match when the header has exactly this value
    pub fn when_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    fn matches(&self, request: &MockRequest) -> bool {
        if let Some(method) = &self.method {
            if method.as_str() != request.method {
                return false;
            }
        }
        if self.pattern.matches(&request.path).is_none() {
            return false;
        }
        if !self
            .headers
            .iter()
            .all(|(name, value)| request.headers.get(name) == Some(value))
        {
            return false;
        }
        match &self.json_subset {
            Some(subset) => request.json().is_some_and(|body| json_contains(&body, subset)),
            None => true,
        }
    }
}

/// A request the server received
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Lowercased names
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<RwLock<Vec<MockRoute>>>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

/// Handle to a running mock server. Stops when dropped.
pub struct MockServer {
    base_url: String,
    state: MockState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    /// Start with an empty route table
    pub async fn start() -> E2eResult<Self> {
        Self::start_with(Vec::new()).await
    }

    pub async fn start_with(routes: Vec<MockRoute>) -> E2eResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| E2eError::MockServer(format!("bind failed: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| E2eError::MockServer(format!("local addr failed: {}", e)))?;
        let base_url = format!("http://{}", addr);

        let state = MockState::default();
        state.routes.write().extend(routes);

        let app = Router::new().fallback(handle_request).with_state(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!("Mock server error: {}", e);
            }
        });

        info!("Mock server listening on {}", base_url);
        Ok(Self {
            base_url,
            state,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Append a route; earlier routes keep priority
    pub fn mock(&self, route: MockRoute) {
        self.state.routes.write().push(route);
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.state.requests.lock().clone()
    }

    /// Number of received requests with this method and exact path
    pub fn received(&self, method: &str, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case(method) && r.path == path)
            .count()
    }

    pub fn last_request(&self) -> Option<MockRequest> {
        self.state.requests.lock().last().cloned()
    }

    /// Forget routes and recorded requests
    pub fn reset(&self) {
        self.state.routes.write().clear();
        self.state.requests.lock().clear();
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn handle_request(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = MockRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let response = state
        .routes
        .read()
        .iter()
        .find(|route| route.matches(&request))
        .map(|route| route.response.clone());

    debug!(
        "mock {} {} -> {}",
        request.method,
        request.path,
        response.as_ref().map_or(404, |r| r.status)
    );
    state.requests.lock().push(request);

    match response {
        Some(response) => {
            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }
            response.render(&body)
        }
        None => (StatusCode::NOT_FOUND, axum::Json(json!({ "error": "no mock route" }))).into_response(),
    }
}

/// True when every field of `subset` appears in `value` with an equal value,
/// recursing into objects.
pub fn json_contains(value: &Value, subset: &Value) -> bool {
    match (value, subset) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| json_contains(a, v))),
        _ => value == subset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_literal_and_params() {
        let pattern = RoutePattern::parse("/booking/:id").unwrap();
        let params = pattern.matches("/booking/42").unwrap();
        assert_eq!(params["id"], "42");
        assert!(pattern.matches("/booking/42/").is_some());
        assert!(pattern.matches("/booking").is_none());
        assert!(pattern.matches("/booking/42/extra").is_none());
    }

    #[test]
    fn test_pattern_wildcard() {
        let pattern = RoutePattern::parse("/api/*").unwrap();
        assert!(pattern.matches("/api").is_some());
        assert!(pattern.matches("/api/v1/objects").is_some());
        assert!(pattern.matches("/other").is_none());
    }

    #[test]
    fn test_pattern_escapes_literals() {
        let pattern = RoutePattern::parse("/files/a.json").unwrap();
        assert!(pattern.matches("/files/a.json").is_some());
        assert!(pattern.matches("/files/aXjson").is_none());
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(RoutePattern::parse("booking").is_err());
        assert!(RoutePattern::parse("/a/*/b").is_err());
        assert!(RoutePattern::parse("/a/:").is_err());
    }

    #[test]
    fn test_json_contains() {
        let body = json!({"username": "admin", "password": "x", "meta": {"a": 1, "b": 2}});
        assert!(json_contains(&body, &json!({"username": "admin"})));
        assert!(json_contains(&body, &json!({"meta": {"a": 1}})));
        assert!(!json_contains(&body, &json!({"username": "other"})));
        assert!(!json_contains(&body, &json!({"missing": true})));
    }

    #[test]
    fn test_route_matching_rules() {
        let request = MockRequest {
            method: "DELETE".to_string(),
            path: "/booking/1".to_string(),
            query: None,
            headers: BTreeMap::from([("cookie".to_string(), "token=abc".to_string())]),
            body: String::new(),
        };

        assert!(MockRoute::delete("/booking/:id", MockResponse::empty(201)).matches(&request));
        assert!(MockRoute::any("/booking/:id", MockResponse::empty(201)).matches(&request));
        assert!(!MockRoute::get("/booking/:id", MockResponse::empty(200)).matches(&request));
        assert!(MockRoute::delete("/booking/:id", MockResponse::empty(201))
            .when_header("Cookie", "token=abc")
            .matches(&request));
        assert!(!MockRoute::delete("/booking/:id", MockResponse::empty(201))
            .when_header("Cookie", "token=zzz")
            .matches(&request));
        assert!(!MockRoute::delete("/booking/:id", MockResponse::empty(201))
            .when_json(json!({"a": 1}))
            .matches(&request));
    }
}
