//! Error handler that reports failed requests before handing them back.

use async_trait::async_trait;
use reqwest::Response;
use tracing::{error, warn};

use tokengate_client::{ResourceServerErrorHandler, TransportError};

/// Logs resource-server failures, then returns them unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

#[async_trait]
impl ResourceServerErrorHandler for LoggingErrorHandler {
    async fn handle_error(&self, error: TransportError) -> reqwest_middleware::Result<Response> {
        if error.is_unauthorized() {
            warn!("Resource server rejected the request; the access token is missing or invalid");
        } else {
            error!(%error, "Resource server request failed");
        }

        error.into_result()
    }
}
