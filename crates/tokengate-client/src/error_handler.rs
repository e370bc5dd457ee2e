//! Recovery hook for failed resource-server requests.
//!
//! The authorizer never decides what a failure means. Retrying, logging the
//! user out or giving up is the handler's call.

use async_trait::async_trait;
use reqwest::Response;

use crate::error::TransportError;

/// Decides what happens after a resource-server request fails.
///
/// Called at most once per request, and only for requests the resource-server
/// configuration covers. Whatever the handler returns is what the caller sees.
#[async_trait]
pub trait ResourceServerErrorHandler: Send + Sync {
    /// Produces the outcome for a failed request.
    ///
    /// # Errors
    ///
    /// Returns an error when the failure should reach the caller as an error.
    async fn handle_error(&self, error: TransportError) -> reqwest_middleware::Result<Response>;
}

/// Handler that hands every failure back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopErrorHandler;

#[async_trait]
impl ResourceServerErrorHandler for NoopErrorHandler {
    async fn handle_error(&self, error: TransportError) -> reqwest_middleware::Result<Response> {
        error.into_result()
    }
}
