//! Domain service facades
//!
//! Each service owns a [`SessionClient`](crate::SessionClient) and exposes
//! only the calls that make sense for its API.

pub mod booking;
pub mod objects;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::response::ApiResponse;

pub use booking::{Booking, BookingDates, BookingFilter, BookingService, BOOKING_TOKEN_KEY};
pub use objects::{DeviceObject, ObjectsService};

/// Common surface for health checks across services
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Short service name for reports
    fn name(&self) -> &'static str;

    fn base_url(&self) -> &str;

    /// Cheapest request that proves the service answers
    async fn health(&self) -> ClientResult<ApiResponse>;
}
