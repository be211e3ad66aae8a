//! Declarative YAML API scenarios

use once_cell::sync::Lazy;
use qakit_client::{ApiResponse, AssertionFailure, AuthConfig};
use qakit_common::Target;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiScenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Which configured service the paths are relative to
    pub service: ServiceRef,

    /// Session-level authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Skipped scenarios are reported but not run
    #[serde(default)]
    pub skip: bool,

    /// Steps to execute in order
    pub steps: Vec<ApiStep>,
}

/// A configured service, or an explicit base URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceRef {
    Named(Target),
    Url { url: String },
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApiStep {
    /// Send one HTTP request
    Request {
        method: String,
        path: String,
        #[serde(default)]
        json: Option<Value>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        query: BTreeMap<String, String>,
        #[serde(default)]
        expect: Option<Expectation>,
        /// variable name -> JSON path in the response
        #[serde(default)]
        capture: BTreeMap<String, String>,
    },

    /// Log in to the booking service; the token becomes `${token}`
    Authenticate {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    /// POST a GraphQL operation to the service endpoint
    Graphql {
        query: String,
        #[serde(default)]
        variables: Option<Value>,
        #[serde(default)]
        operation_name: Option<String>,
        #[serde(default)]
        path: Option<String>,
        /// Accept a response carrying `errors`
        #[serde(default)]
        allow_errors: bool,
        #[serde(default)]
        expect: Option<Expectation>,
        #[serde(default)]
        capture: BTreeMap<String, String>,
    },

    /// Log a message (for debugging)
    Log { message: String },
}

impl ApiStep {
    /// Short name used in results
    pub fn name(&self) -> String {
        match self {
            ApiStep::Request { method, path, .. } => format!("{} {}", method.to_uppercase(), path),
            ApiStep::Authenticate { .. } => "authenticate".to_string(),
            ApiStep::Graphql { operation_name, .. } => {
                format!("graphql:{}", operation_name.as_deref().unwrap_or("anonymous"))
            }
            ApiStep::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }
}

/// Checks applied to a response, in field order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub json: Option<Value>,
    #[serde(default)]
    pub json_path: BTreeMap<String, Value>,
    #[serde(default)]
    pub json_path_contains: BTreeMap<String, Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub has_headers: Vec<String>,
}

impl Expectation {
    /// First failing check, if any
    pub fn verify(&self, response: &ApiResponse) -> Result<(), AssertionFailure> {
        if let Some(status) = self.status {
            response.check_status(status)?;
        }
        if let Some(json) = &self.json {
            response.check_json(json)?;
        }
        for (path, expected) in &self.json_path {
            response.check_json_path(path, expected)?;
        }
        for (path, needle) in &self.json_path_contains {
            response.check_json_path_contains(path, needle)?;
        }
        for (name, value) in &self.headers {
            response.check_header(name, value)?;
        }
        for name in &self.has_headers {
            response.check_has_header(name)?;
        }
        Ok(())
    }
}

/// Values captured during one scenario run
pub type Variables = HashMap<String, String>;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::(number|bool))?\}").expect("placeholder regex is valid")
});

/// Replace `${name}` placeholders. Unknown names are an error.
///
/// Inside a string a typed placeholder such as `${id:number}` is replaced
/// by the plain text of the value.
pub fn substitute(input: &str, vars: &Variables) -> E2eResult<String> {
    let mut missing = None;
    let output = PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(E2eError::UndefinedVariable(name)),
        None => Ok(output.into_owned()),
    }
}

/// A JSON string that is exactly one `${name:number}` or `${name:bool}`
fn typed_placeholder(value: &str, vars: &Variables) -> E2eResult<Option<Value>> {
    let Some(caps) = PLACEHOLDER.captures(value) else {
        return Ok(None);
    };
    let (Some(whole), Some(kind)) = (caps.get(0), caps.get(2)) else {
        return Ok(None);
    };
    if whole.start() != 0 || whole.end() != value.len() {
        return Ok(None);
    }

    let name = &caps[1];
    let raw = vars
        .get(name)
        .ok_or_else(|| E2eError::UndefinedVariable(name.to_string()))?;
    let parsed = match kind.as_str() {
        "number" => serde_json::from_str::<Value>(raw.trim())
            .ok()
            .filter(Value::is_number),
        _ => match raw.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
    };

    parsed.map(Some).ok_or_else(|| E2eError::PlaceholderType {
        name: name.to_string(),
        kind: kind.as_str().to_string(),
        value: raw.clone(),
    })
}

/// Substitute placeholders in every string inside a JSON value.
///
/// Plain placeholders always produce strings. A string that is exactly one
/// typed placeholder becomes a JSON scalar, so `"${booking_id:number}"`
/// sends a numeric id while `"${id}"` keeps `"7"` a string.
pub fn substitute_json(value: &Value, vars: &Variables) -> E2eResult<Value> {
    Ok(match value {
        Value::String(s) => match typed_placeholder(s, vars)? {
            Some(scalar) => scalar,
            None => Value::String(substitute(s, vars)?),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_json(item, vars))
                .collect::<E2eResult<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), substitute_json(v, vars)?)))
                .collect::<E2eResult<_>>()?,
        ),
        other => other.clone(),
    })
}

/// Render a captured JSON value as a variable. Strings lose their quotes.
pub fn capture_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ApiScenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no steps", scenario.name)));
        }
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_booking_scenario() {
        let yaml = r#"
name: booking-crud
description: Create then delete a booking
tags: [booking, smoke]
service: booking
steps:
  - action: authenticate
  - action: request
    method: post
    path: /booking
    json:
      firstname: Jim
      totalprice: 111
    expect:
      status: 200
      json_path:
        booking.firstname: Jim
    capture:
      booking_id: bookingid
  - action: request
    method: DELETE
    path: /booking/${booking_id}
    headers:
      Cookie: token=${token}
    expect:
      status: 201
"#;
        let scenario = ApiScenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "booking-crud");
        assert_eq!(scenario.service, ServiceRef::Named(Target::Booking));
        assert_eq!(scenario.auth, AuthConfig::None);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[1].name(), "POST /booking");
    }

    #[test]
    fn test_parse_url_service_and_auth() {
        let yaml = r#"
name: objects-with-key
service:
  url: http://localhost:8080
auth:
  type: api_key
  key: secret
steps:
  - action: graphql
    query: "{ __typename }"
  - action: log
    message: done
"#;
        let scenario = ApiScenario::from_yaml(yaml).unwrap();
        assert_eq!(
            scenario.service,
            ServiceRef::Url {
                url: "http://localhost:8080".to_string()
            }
        );
        assert_eq!(scenario.auth, AuthConfig::api_key("secret"));
        assert_eq!(scenario.steps[0].name(), "graphql:anonymous");
    }

    #[test]
    fn test_scenario_without_steps_rejected() {
        let err = ApiScenario::from_yaml("name: empty\nservice: ui\nsteps: []\n").unwrap_err();
        assert!(matches!(err, E2eError::SpecParse(_)));
    }

    #[test]
    fn test_substitute() {
        let vars = vars(&[("id", "42"), ("token", "abc")]);
        assert_eq!(substitute("/booking/${id}", &vars).unwrap(), "/booking/42");
        assert_eq!(substitute("token=${token};id=${id}", &vars).unwrap(), "token=abc;id=42");
        assert_eq!(substitute("no placeholders", &vars).unwrap(), "no placeholders");

        let err = substitute("/x/${nope}", &vars).unwrap_err();
        assert!(matches!(err, E2eError::UndefinedVariable(ref n) if n == "nope"));
    }

    #[test]
    fn test_substitute_json_plain_placeholders_stay_strings() {
        let vars = vars(&[("id", "7"), ("name", "Widget"), ("paid", "true")]);
        let body = json!({
            "id": "${id}",
            "label": "item-${id}",
            "name": "${name}",
            "paid": "${paid}",
            "list": ["${name}", 1],
        });
        let out = substitute_json(&body, &vars).unwrap();
        assert_eq!(
            out,
            json!({"id": "7", "label": "item-7", "name": "Widget", "paid": "true", "list": ["Widget", 1]})
        );
    }

    #[test]
    fn test_substitute_json_typed_placeholders() {
        let vars = vars(&[("id", "42"), ("price", "9.5"), ("paid", "false"), ("name", "Widget")]);
        let body = json!({
            "id": "${id:number}",
            "price": "${price:number}",
            "paid": "${paid:bool}",
            "path": "/booking/${id:number}",
        });
        let out = substitute_json(&body, &vars).unwrap();
        assert_eq!(out, json!({"id": 42, "price": 9.5, "paid": false, "path": "/booking/42"}));

        let err = substitute_json(&json!({"n": "${name:number}"}), &vars).unwrap_err();
        assert!(matches!(err, E2eError::PlaceholderType { ref name, ref kind, .. } if name == "name" && kind == "number"));

        let err = substitute_json(&json!("${missing:bool}"), &vars).unwrap_err();
        assert!(matches!(err, E2eError::UndefinedVariable(ref n) if n == "missing"));
    }

    #[test]
    fn test_capture_value() {
        assert_eq!(capture_value(&json!("abc")), "abc");
        assert_eq!(capture_value(&json!(12)), "12");
        assert_eq!(capture_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\ntags: [smoke]\nservice: objects\nsteps:\n  - action: log\n    message: hi\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: a\nservice: booking\nsteps:\n  - action: log\n    message: hi\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = ApiScenario::load_all(dir.path()).unwrap();
        assert_eq!(scenarios.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ApiScenario::filter_by_tag(&scenarios, "smoke").len(), 1);
    }
}
