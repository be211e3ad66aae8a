//! Response wrapper with cached JSON, path extraction and fluent assertions
//!
//! The body is read in full when the wrapper is built. JSON is parsed at most
//! once; every later call hands out the same cached value.

use bytes::Bytes;
use once_cell::sync::OnceCell;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{ClientError, ClientResult};

/// A failed check against a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub check: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionFailure {
    fn new(check: impl Into<String>, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self {
            check: check.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.check, self.expected, self.actual)
    }
}

impl std::error::Error for AssertionFailure {}

/// One HTTP response, fully buffered
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: String,
    body: Bytes,
    elapsed: Duration,
    json: OnceCell<Value>,
}

impl fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("body_len", &self.body.len())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl ApiResponse {
    /// Buffer a reqwest response. `started` is when the request was sent.
    pub async fn from_reqwest(response: reqwest::Response, started: Instant) -> ClientResult<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            url,
            body,
            elapsed: started.elapsed(),
            json: OnceCell::new(),
        })
    }

    /// Build a response from parts, for stubs and tests
    pub fn from_parts(
        status: StatusCode,
        headers: HeaderMap,
        url: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            status,
            headers,
            url: url.into(),
            body: body.into(),
            elapsed: Duration::ZERO,
            json: OnceCell::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value by case-insensitive name. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Final URL after redirects
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code())
    }

    pub fn is_client_error(&self) -> bool {
        (400..=499).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        (500..=599).contains(&self.status_code())
    }

    /// Parsed body, cached after the first successful parse
    pub fn json_value(&self) -> ClientResult<&Value> {
        self.json
            .get_or_try_init(|| serde_json::from_slice(&self.body))
            .map_err(ClientError::from)
    }

    /// Body deserialized into `T`, read from the cached value
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        T::deserialize(self.json_value()?).map_err(ClientError::from)
    }

    /// Dot-path lookup such as `user.address.city` or `items.0.id`.
    ///
    /// Returns `None` at the first missing segment, or when the body is not
    /// JSON.
    pub fn extract(&self, path: &str) -> Option<&Value> {
        extract_path(self.json_value().ok()?, path)
    }

    pub fn check_status(&self, expected: u16) -> Result<(), AssertionFailure> {
        if self.status_code() == expected {
            Ok(())
        } else {
            Err(AssertionFailure::new(
                "status",
                expected,
                format!("{} (body: {})", self.status_code(), preview(&self.text())),
            ))
        }
    }

    pub fn check_json(&self, expected: &Value) -> Result<(), AssertionFailure> {
        let actual = self.json_for_check("json")?;
        if actual == expected {
            Ok(())
        } else {
            Err(AssertionFailure::new("json", expected, actual))
        }
    }

    pub fn check_json_path(&self, path: &str, expected: &Value) -> Result<(), AssertionFailure> {
        let check = format!("json path '{}'", path);
        let root = self.json_for_check(&check)?;
        match extract_path(root, path) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(AssertionFailure::new(check, expected, actual)),
            None => Err(AssertionFailure::new(check, expected, "<missing>")),
        }
    }

    /// Strings must contain the needle as a substring, arrays must contain
    /// an equal element, objects must contain the needle as a key.
    pub fn check_json_path_contains(&self, path: &str, needle: &Value) -> Result<(), AssertionFailure> {
        let check = format!("json path '{}' contains", path);
        let root = self.json_for_check(&check)?;
        let Some(actual) = extract_path(root, path) else {
            return Err(AssertionFailure::new(check, needle, "<missing>"));
        };

        let found = match (actual, needle) {
            (Value::String(haystack), Value::String(n)) => haystack.contains(n.as_str()),
            (Value::Array(items), n) => items.contains(n),
            (Value::Object(map), Value::String(key)) => map.contains_key(key),
            _ => false,
        };

        if found {
            Ok(())
        } else {
            Err(AssertionFailure::new(check, needle, actual))
        }
    }

    pub fn check_header(&self, name: &str, expected: &str) -> Result<(), AssertionFailure> {
        let check = format!("header '{}'", name);
        match self.header(name) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(AssertionFailure::new(check, expected, actual)),
            None => Err(AssertionFailure::new(check, expected, "<missing>")),
        }
    }

    pub fn check_has_header(&self, name: &str) -> Result<(), AssertionFailure> {
        if self.headers.contains_key(name) {
            Ok(())
        } else {
            Err(AssertionFailure::new(format!("header '{}'", name), "present", "<missing>"))
        }
    }

    #[track_caller]
    pub fn assert_status(&self, expected: u16) -> &Self {
        self.expect(self.check_status(expected))
    }

    #[track_caller]
    pub fn assert_json(&self, expected: &Value) -> &Self {
        self.expect(self.check_json(expected))
    }

    #[track_caller]
    pub fn assert_json_path(&self, path: &str, expected: &Value) -> &Self {
        self.expect(self.check_json_path(path, expected))
    }

    #[track_caller]
    pub fn assert_json_path_contains(&self, path: &str, needle: &Value) -> &Self {
        self.expect(self.check_json_path_contains(path, needle))
    }

    #[track_caller]
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        self.expect(self.check_header(name, expected))
    }

    #[track_caller]
    pub fn assert_has_header(&self, name: &str) -> &Self {
        self.expect(self.check_has_header(name))
    }

    #[track_caller]
    fn expect(&self, outcome: Result<(), AssertionFailure>) -> &Self {
        if let Err(failure) = outcome {
            panic!("{} [{} {}]", failure, self.status_code(), self.url);
        }
        self
    }

    fn json_for_check(&self, check: &str) -> Result<&Value, AssertionFailure> {
        self.json_value()
            .map_err(|e| AssertionFailure::new(check, "a JSON body", format!("invalid JSON ({})", e)))
    }
}

/// Walk `value` along a dot-separated path. Numeric segments index arrays.
/// An empty path returns the root.
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn preview(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}
