//! Booking service (restful-booker API)
//!
//! Mutating calls need a token from [`BookingService::authenticate`]. The
//! token travels as a `token` cookie; deletes also carry the service's fixed
//! admin Basic credential, which the API requires alongside the cookie.

use async_trait::async_trait;
use chrono::NaiveDate;
use qakit_common::{EnvironmentConfig, Target};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::ServiceClient;
use crate::error::{ClientError, ClientResult};
use crate::response::ApiResponse;
use crate::session::{RequestOptions, SessionClient, SessionOptions};
use crate::token::{AuthToken, TokenStore};

/// Token store key written by `authenticate`
pub const BOOKING_TOKEN_KEY: &str = "restful-booker";

/// admin:password123, the credential the API accepts for deletes
const ADMIN_BASIC_AUTH: &str = "Basic YWRtaW46cGFzc3dvcmQxMjM=";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDates {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub firstname: String,
    pub lastname: String,
    pub totalprice: u32,
    pub depositpaid: bool,
    pub bookingdates: BookingDates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additionalneeds: Option<String>,
}

/// Body returned by `POST /booking`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedBooking {
    pub bookingid: u64,
    pub booking: Booking,
}

/// Entry of `GET /booking`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BookingId {
    pub bookingid: u64,
}

/// Query filters for `GET /booking`
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
}

impl BookingFilter {
    fn apply(&self, mut options: RequestOptions) -> RequestOptions {
        if let Some(v) = &self.firstname {
            options = options.query("firstname", v.as_str());
        }
        if let Some(v) = &self.lastname {
            options = options.query("lastname", v.as_str());
        }
        if let Some(v) = self.checkin {
            options = options.query("checkin", v.to_string());
        }
        if let Some(v) = self.checkout {
            options = options.query("checkout", v.to_string());
        }
        options
    }
}

pub struct BookingService {
    session: SessionClient,
    tokens: TokenStore,
}

impl BookingService {
    /// Build and initialize the service. `tokens` receives the token written
    /// by `authenticate`.
    pub fn new(options: SessionOptions, tokens: TokenStore) -> ClientResult<Self> {
        let options = options.with_header("Accept", "application/json");
        Ok(Self {
            session: SessionClient::connect(options)?,
            tokens,
        })
    }

    pub fn from_env(config: &EnvironmentConfig, tokens: TokenStore) -> ClientResult<Self> {
        Self::new(SessionOptions::from_env(config, Target::Booking), tokens)
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn dispose(&mut self) {
        self.session.dispose();
    }

    /// Exchange credentials for a token, store it under
    /// [`BOOKING_TOKEN_KEY`] and return it.
    pub async fn authenticate(&self, username: &str, password: &str) -> ClientResult<AuthToken> {
        let body = json!({ "username": username, "password": password });
        let response = self.session.post("/auth", RequestOptions::new().json(body)).await?;
        let parsed = response.json_value()?;

        match parsed.get("token").and_then(Value::as_str) {
            Some(token) => {
                if self.tokens.store_token(BOOKING_TOKEN_KEY, token).is_some() {
                    debug!("Replaced existing booking token");
                }
                info!("Authenticated against booking service as {}", username);
                Ok(AuthToken::new(token))
            }
            None => {
                let reason = parsed
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("no token in response (status {})", response.status_code()));
                Err(ClientError::AuthenticationFailed(reason))
            }
        }
    }

    /// Token written by the last `authenticate` on this store
    pub fn stored_token(&self) -> ClientResult<AuthToken> {
        self.tokens
            .get_token(BOOKING_TOKEN_KEY)
            .map(AuthToken::from)
            .ok_or_else(|| ClientError::TokenNotFound {
                key: BOOKING_TOKEN_KEY.to_string(),
            })
    }

    pub async fn health_check(&self) -> ClientResult<ApiResponse> {
        self.session.get("/ping", RequestOptions::new()).await
    }

    pub async fn get_booking_ids(&self, filter: &BookingFilter) -> ClientResult<ApiResponse> {
        self.session.get("/booking", filter.apply(RequestOptions::new())).await
    }

    pub async fn get_booking(&self, id: u64) -> ClientResult<ApiResponse> {
        self.session.get(&booking_path(id), RequestOptions::new()).await
    }

    pub async fn create_booking(&self, booking: &Booking) -> ClientResult<ApiResponse> {
        self.session.post("/booking", RequestOptions::json_of(booking)?).await
    }

    pub async fn update_booking(&self, id: u64, booking: &Booking) -> ClientResult<ApiResponse> {
        let token = self.stored_token()?;
        self.update_booking_with_token(&token, id, booking).await
    }

    pub async fn update_booking_with_token(
        &self,
        token: &AuthToken,
        id: u64,
        booking: &Booking,
    ) -> ClientResult<ApiResponse> {
        let options = with_token_cookie(RequestOptions::json_of(booking)?, token);
        self.session.put(&booking_path(id), options).await
    }

    pub async fn partial_update_booking(&self, id: u64, fields: &Value) -> ClientResult<ApiResponse> {
        let token = self.stored_token()?;
        self.partial_update_booking_with_token(&token, id, fields).await
    }

    pub async fn partial_update_booking_with_token(
        &self,
        token: &AuthToken,
        id: u64,
        fields: &Value,
    ) -> ClientResult<ApiResponse> {
        let options = with_token_cookie(RequestOptions::new().json(fields.clone()), token);
        self.session.patch(&booking_path(id), options).await
    }

    pub async fn delete_booking(&self, id: u64) -> ClientResult<ApiResponse> {
        let token = self.stored_token()?;
        self.delete_booking_with_token(&token, id).await
    }

    pub async fn delete_booking_with_token(&self, token: &AuthToken, id: u64) -> ClientResult<ApiResponse> {
        let options = with_token_cookie(RequestOptions::new(), token).header("Authorization", ADMIN_BASIC_AUTH);
        self.session.delete(&booking_path(id), options).await
    }
}

#[async_trait]
impl ServiceClient for BookingService {
    fn name(&self) -> &'static str {
        "booking"
    }

    fn base_url(&self) -> &str {
        self.session.base_url()
    }

    async fn health(&self) -> ClientResult<ApiResponse> {
        self.health_check().await
    }
}

fn booking_path(id: u64) -> String {
    format!("/booking/{}", id)
}

fn with_token_cookie(options: RequestOptions, token: &AuthToken) -> RequestOptions {
    options.header("Cookie", format!("token={}", token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_serializes_api_shape() {
        let booking = Booking {
            firstname: "Jim".to_string(),
            lastname: "Brown".to_string(),
            totalprice: 111,
            depositpaid: true,
            bookingdates: BookingDates {
                checkin: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
                checkout: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            },
            additionalneeds: None,
        };

        let value = serde_json::to_value(&booking).unwrap();
        assert_eq!(value["bookingdates"]["checkin"], "2018-01-01");
        assert!(value.get("additionalneeds").is_none());
    }

    #[test]
    fn test_filter_builds_query() {
        let filter = BookingFilter {
            firstname: Some("sally".to_string()),
            checkin: NaiveDate::from_ymd_opt(2014, 3, 13),
            ..Default::default()
        };
        let options = filter.apply(RequestOptions::new());
        assert_eq!(
            options.query,
            vec![
                ("firstname".to_string(), "sally".to_string()),
                ("checkin".to_string(), "2014-03-13".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_mutations_require_token() {
        let service = BookingService::new(SessionOptions::new("http://127.0.0.1:9"), TokenStore::new()).unwrap();

        let err = service.delete_booking(1).await.unwrap_err();
        assert!(err.to_string().contains("Authentication token not found"));
        assert!(matches!(service.update_booking(1, &sample()).await, Err(ClientError::TokenNotFound { .. })));
        assert!(matches!(
            service.partial_update_booking(1, &json!({"firstname": "X"})).await,
            Err(ClientError::TokenNotFound { .. })
        ));
    }

    fn sample() -> Booking {
        Booking {
            firstname: "Sally".to_string(),
            lastname: "Brown".to_string(),
            totalprice: 100,
            depositpaid: false,
            bookingdates: BookingDates {
                checkin: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                checkout: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            },
            additionalneeds: Some("Breakfast".to_string()),
        }
    }
}
