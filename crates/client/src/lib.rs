//! QAKit HTTP client layer
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  BookingService   ObjectsService   GraphQLClient           │
//! │        └──────────────┼─────────────────┘                  │
//! │                 SessionClient  ── AuthConfig               │
//! │                       │                                    │
//! │                  ApiResponse   (cached JSON, assertions)   │
//! │                                                            │
//! │  TokenStore: injected key -> token map shared by handles   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services compose a [`SessionClient`] rather than extending it. Tokens are
//! returned from `authenticate` and also written to the [`TokenStore`] the
//! caller injected, never to a process-wide static.

pub mod auth;
pub mod error;
pub mod graphql;
pub mod response;
pub mod services;
pub mod session;
pub mod token;

pub use auth::AuthConfig;
pub use error::{ClientError, ClientResult};
pub use graphql::{BatchItemResult, GraphQLClient, GraphQLError, GraphQLRequest, GraphQLResponse};
pub use response::{extract_path, ApiResponse, AssertionFailure};
pub use services::{Booking, BookingDates, BookingFilter, BookingService, DeviceObject, ObjectsService, ServiceClient};
pub use session::{RequestOptions, SessionClient, SessionOptions};
pub use token::{AuthToken, TokenStore};
