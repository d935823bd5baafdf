use crate::domain::error::RequestError;
use crate::domain::model::{HttpReply, HttpRequest};
use async_trait::async_trait;

/// Trait for the HTTP transport
///
/// Every outbound call (data reads, contact submission, IP discovery,
/// analytics beacons) goes through this seam, so the reqwest-backed
/// implementation can be swapped for a scripted one in tests.
/// Implementations report non-2xx statuses as a normal reply; only
/// connection-level failures become errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, RequestError>;
}
