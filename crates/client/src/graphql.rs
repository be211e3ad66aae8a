//! GraphQL client
//!
//! Every operation is a POST of `{query, variables, operationName}` to one
//! endpoint. Batching is client-side accumulation: queued requests go out as
//! one JSON array and each comes back with its own result. The queue is only
//! emptied once the server has answered; a transport failure leaves it intact
//! so the caller can retry or inspect it.

use async_trait::async_trait;
use qakit_common::{EnvironmentConfig, Target};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::response::{extract_path, ApiResponse};
use crate::services::ServiceClient;
use crate::session::{RequestOptions, SessionClient, SessionOptions};

/// Default cap on queued batch requests
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types {
      kind
      name
      description
      fields(includeDeprecated: true) {
        name
        args { name type { kind name ofType { kind name } } }
        type { kind name ofType { kind name } }
      }
    }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Standard `{data?, errors?}` response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
}

impl GraphQLResponse {
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    pub fn errors(&self) -> &[GraphQLError] {
        self.errors.as_deref().unwrap_or_default()
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.errors().iter().map(|e| e.message.as_str()).collect()
    }

    /// Dot-path lookup under `data`
    pub fn extract(&self, path: &str) -> Option<&Value> {
        extract_path(self.data.as_ref()?, path)
    }

    /// `data` deserialized into `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let data = self.data.as_ref().unwrap_or(&Value::Null);
        T::deserialize(data).map_err(ClientError::from)
    }
}

/// Outcome of one queued request
pub type BatchItemResult = Result<GraphQLResponse, String>;

pub struct GraphQLClient {
    session: SessionClient,
    endpoint: String,
    max_batch_size: usize,
    batch: Vec<GraphQLRequest>,
}

impl GraphQLClient {
    /// `endpoint` is appended to the session base URL; pass `""` when the
    /// base URL already is the endpoint.
    pub fn new(options: SessionOptions, endpoint: impl Into<String>) -> ClientResult<Self> {
        let options = options.with_header("Accept", "application/json");
        Ok(Self {
            session: SessionClient::connect(options)?,
            endpoint: endpoint.into(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            batch: Vec::new(),
        })
    }

    pub fn from_env(config: &EnvironmentConfig) -> ClientResult<Self> {
        Self::new(SessionOptions::from_env(config, Target::Graphql), "")
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max.max(1);
        self
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub fn dispose(&mut self) {
        self.session.dispose();
    }

    pub async fn query(
        &self,
        query: &str,
        variables: Option<Value>,
        operation_name: Option<&str>,
    ) -> ClientResult<GraphQLResponse> {
        self.execute(&build_request(query, variables, operation_name)).await
    }

    pub async fn mutate(
        &self,
        mutation: &str,
        variables: Option<Value>,
        operation_name: Option<&str>,
    ) -> ClientResult<GraphQLResponse> {
        self.execute(&build_request(mutation, variables, operation_name)).await
    }

    /// Send one request and parse the GraphQL body, whatever the status
    pub async fn execute(&self, request: &GraphQLRequest) -> ClientResult<GraphQLResponse> {
        self.execute_raw(request).await?.json()
    }

    /// Send one request and keep the raw response for assertions
    pub async fn execute_raw(&self, request: &GraphQLRequest) -> ClientResult<ApiResponse> {
        self.session
            .post(&self.endpoint, RequestOptions::json_of(request)?)
            .await
    }

    /// The `__schema` object, or `None` when the server refuses introspection
    pub async fn introspect(&self) -> ClientResult<Option<Value>> {
        let request = GraphQLRequest::new(INTROSPECTION_QUERY).with_operation_name("IntrospectionQuery");
        match self.execute(&request).await {
            Ok(response) if !response.has_errors() => Ok(response.extract("__schema").cloned()),
            Ok(response) => {
                warn!("Introspection rejected: {}", response.error_messages().join("; "));
                Ok(None)
            }
            Err(ClientError::Json(e)) => {
                warn!("Introspection returned a non-GraphQL body: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Queue a request, returning the new queue length
    pub fn add_to_batch(&mut self, request: GraphQLRequest) -> ClientResult<usize> {
        if self.batch.len() >= self.max_batch_size {
            return Err(ClientError::BatchFull {
                max: self.max_batch_size,
            });
        }
        self.batch.push(request);
        Ok(self.batch.len())
    }

    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    pub fn pending_batch(&self) -> &[GraphQLRequest] {
        &self.batch
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Send the queue as one array request.
    ///
    /// Results line up with the queued requests. The queue is cleared once a
    /// response arrives, even if individual items failed.
    pub async fn execute_batch(&mut self) -> ClientResult<Vec<BatchItemResult>> {
        if self.batch.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::to_value(&self.batch)?;
        let response = self
            .session
            .post(&self.endpoint, RequestOptions::new().json(body))
            .await?;

        let sent = std::mem::take(&mut self.batch);
        debug!("Batch of {} answered with {}", sent.len(), response.status_code());
        Ok(split_batch_response(&response, sent.len()))
    }
}

#[async_trait]
impl ServiceClient for GraphQLClient {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn base_url(&self) -> &str {
        self.session.base_url()
    }

    async fn health(&self) -> ClientResult<ApiResponse> {
        self.execute_raw(&GraphQLRequest::new("{ __typename }")).await
    }
}

fn build_request(query: &str, variables: Option<Value>, operation_name: Option<&str>) -> GraphQLRequest {
    GraphQLRequest {
        query: query.to_string(),
        variables,
        operation_name: operation_name.map(str::to_string),
    }
}

/// Map a batch response onto `count` per-item results
fn split_batch_response(response: &ApiResponse, count: usize) -> Vec<BatchItemResult> {
    let items = match response.json_value() {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            let reason = match serde_json::from_value::<GraphQLResponse>(other.clone()) {
                Ok(single) if single.has_errors() => single.error_messages().join("; "),
                _ => format!("server did not return a batch (status {})", response.status_code()),
            };
            return vec![Err(reason); count];
        }
        Err(e) => return vec![Err(format!("invalid batch response: {}", e)); count],
    };

    (0..count)
        .map(|i| match items.get(i) {
            Some(item) => serde_json::from_value(item.clone()).map_err(|e| e.to_string()),
            None => Err(format!("no response for batch item {}", i)),
        })
        .collect()
}
