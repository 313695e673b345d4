use async_trait::async_trait;
use thiserror::Error;

use crate::core::resource::{ResourceRequest, ResourceResponse};

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to the upstream fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when request times out
    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) the dev proxy uses to reach
/// upstream servers.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send a request to the absolute URL it carries and collect the
    /// response. Upstream error statuses are returned, not raised.
    async fn send_request(&self, req: ResourceRequest) -> HttpClientResult<ResourceResponse>;
}
