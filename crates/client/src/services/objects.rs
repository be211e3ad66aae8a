//! Device-object service (restful-api.dev `/objects`)

use async_trait::async_trait;
use qakit_common::{EnvironmentConfig, Target};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ServiceClient;
use crate::auth::AuthConfig;
use crate::error::ClientResult;
use crate::response::ApiResponse;
use crate::session::{RequestOptions, SessionClient, SessionOptions};

/// An object as stored by the service. `data` is free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DeviceObject {
    pub fn new(name: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            id: None,
            name: name.into(),
            data,
            created_at: None,
            updated_at: None,
        }
    }
}

pub struct ObjectsService {
    session: SessionClient,
}

impl ObjectsService {
    pub fn new(options: SessionOptions) -> ClientResult<Self> {
        Ok(Self {
            session: SessionClient::connect(options)?,
        })
    }

    /// Uses `OBJECTS_API_KEY` as an `x-api-key` header when configured
    pub fn from_env(config: &EnvironmentConfig) -> ClientResult<Self> {
        let mut options = SessionOptions::from_env(config, Target::Objects);
        if let Some(key) = &config.objects_api_key {
            options = options.with_auth(AuthConfig::api_key(key.as_str()));
        }
        Self::new(options)
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub fn dispose(&mut self) {
        self.session.dispose();
    }

    /// All objects, or only `ids` when given
    pub async fn list_objects(&self, ids: &[&str]) -> ClientResult<ApiResponse> {
        let options = ids
            .iter()
            .fold(RequestOptions::new(), |options, id| options.query("id", *id));
        self.session.get("/objects", options).await
    }

    pub async fn get_object_by_id(&self, id: &str) -> ClientResult<ApiResponse> {
        self.session.get(&object_path(id), RequestOptions::new()).await
    }

    pub async fn create_object(&self, object: &DeviceObject) -> ClientResult<ApiResponse> {
        self.session.post("/objects", RequestOptions::json_of(object)?).await
    }

    pub async fn update_object(&self, id: &str, object: &DeviceObject) -> ClientResult<ApiResponse> {
        self.session.put(&object_path(id), RequestOptions::json_of(object)?).await
    }

    pub async fn partial_update_object(&self, id: &str, fields: &Value) -> ClientResult<ApiResponse> {
        self.session
            .patch(&object_path(id), RequestOptions::new().json(fields.clone()))
            .await
    }

    pub async fn delete_object(&self, id: &str) -> ClientResult<ApiResponse> {
        self.session.delete(&object_path(id), RequestOptions::new()).await
    }
}

#[async_trait]
impl ServiceClient for ObjectsService {
    fn name(&self) -> &'static str {
        "objects"
    }

    fn base_url(&self) -> &str {
        self.session.base_url()
    }

    async fn health(&self) -> ClientResult<ApiResponse> {
        self.list_objects(&["1"]).await
    }
}

fn object_path(id: &str) -> String {
    format!("/objects/{}", id)
}
