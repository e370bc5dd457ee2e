//! Error types for the request authorizer.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Conditions raised inside the authorizer itself.
///
/// None of these reach the caller. They are logged and the request is sent
/// without a token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthorizerError {
    /// No `token_received` event arrived within the wait bound.
    #[error("Timed out after {0:?} waiting for an access token")]
    TokenWaitTimeout(Duration),

    /// The token contains bytes that cannot appear in an HTTP header.
    #[error("Access token is not a valid header value")]
    InvalidToken,
}

/// A failed exchange with the resource server.
///
/// Handed to the [`ResourceServerErrorHandler`](crate::ResourceServerErrorHandler)
/// instead of being returned directly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request could not be completed (connection, TLS, downstream middleware).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The server answered with a 4xx or 5xx status.
    #[error("Resource server returned {}", .0.status())]
    Status(Response),
}

impl TransportError {
    /// Returns the HTTP status, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(response) => Some(response.status()),
            Self::Request(error) => error.status(),
        }
    }

    /// Check if this is an authentication failure (HTTP 401).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Re-surfaces the failure in the shape the transport produced it.
    ///
    /// Request errors become `Err`, error responses are returned as `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the original error for [`TransportError::Request`].
    pub fn into_result(self) -> reqwest_middleware::Result<Response> {
        match self {
            Self::Request(error) => Err(error),
            Self::Status(response) => Ok(response),
        }
    }
}
