//! Authentication schemes and the headers they produce

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ClientError, ClientResult};

/// Header used for API keys when none is configured
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

/// How a session authenticates its requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    ApiKey {
        #[serde(default = "default_api_key_header")]
        header: String,
        key: String,
    },
    /// Headers applied verbatim
    Custom {
        headers: BTreeMap<String, String>,
    },
}

impl AuthConfig {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        AuthConfig::Bearer { token: token.into() }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self::api_key_with_header(DEFAULT_API_KEY_HEADER, key)
    }

    pub fn api_key_with_header(header: impl Into<String>, key: impl Into<String>) -> Self {
        AuthConfig::ApiKey {
            header: header.into(),
            key: key.into(),
        }
    }

    pub fn custom<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        AuthConfig::Custom {
            headers: headers.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Short scheme name for logs
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::Custom { .. } => "custom",
        }
    }

    /// Headers this scheme adds to every request.
    ///
    /// Credentials are not checked for presence; an empty bearer token still
    /// yields `Authorization: Bearer `.
    pub fn headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        match self {
            AuthConfig::None => {}
            AuthConfig::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                headers.insert(AUTHORIZATION, sensitive_value("authorization", &format!("Basic {}", encoded))?);
            }
            AuthConfig::Bearer { token } => {
                headers.insert(AUTHORIZATION, sensitive_value("authorization", &format!("Bearer {}", token))?);
            }
            AuthConfig::ApiKey { header, key } => {
                headers.insert(header_name(header)?, sensitive_value(header, key)?);
            }
            AuthConfig::Custom { headers: custom } => {
                for (name, value) in custom {
                    headers.insert(header_name(name)?, header_value(name, value)?);
                }
            }
        }
        Ok(headers)
    }
}

pub(crate) fn header_name(name: &str) -> ClientResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn header_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn sensitive_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    let mut value = header_value(name, value)?;
    value.set_sensitive(true);
    Ok(value)
}
