//! Bearer-token attachment for outgoing requests.
//!
//! [`RequestAuthorizer`] sits in a `reqwest-middleware` stack. For every request
//! it decides whether the resource-server configuration covers the URL, finds
//! an access token, sets `Authorization: Bearer <token>` and forwards the
//! request. Failed exchanges go to the configured error handler.
//!
//! # Waiting for a token
//!
//! A request can be issued while login is still in flight. The authorizer then
//! races two sources:
//!
//! - the token held right now, if it is non-empty
//! - the next `token_received` event, after which the token is read again
//!
//! The held token always wins when both are ready. The event wait is bounded
//! by [`WAIT_FOR_TOKEN_RECEIVED`] (configurable with
//! [`RequestAuthorizer::with_token_wait`]). When the bound elapses the request
//! is sent without a token rather than held back.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokengate_client::RequestAuthorizer;
//! use tokengate_common::{ResourceServerConfig, SharedTokenStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tokens = SharedTokenStore::new();
//! let authorizer = RequestAuthorizer::new(
//!     ResourceServerConfig {
//!         allowed_urls: Some(vec!["https://api.example.com/".to_string()]),
//!         send_access_token: true,
//!     },
//!     Arc::new(tokens.clone()),
//! );
//!
//! let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
//!     .with(authorizer)
//!     .build();
//!
//! tokens.set_access_token("abc");
//! let response = client.get("https://api.example.com/flights").send().await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Extensions;
use http::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, trace, warn};

use tokengate_common::{AuthEvent, AuthorizerConfig, TokenProvider};

use crate::error::{AuthorizerError, TransportError};
use crate::error_handler::{NoopErrorHandler, ResourceServerErrorHandler};

/// How long a request waits for `token_received` when no token is held.
pub const WAIT_FOR_TOKEN_RECEIVED: Duration = Duration::from_millis(1000);

/// What the authorizer does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Forward unmodified; failures reach the caller untouched.
    PassThrough,
    /// Forward unmodified; failures go to the error handler.
    Forward,
    /// Attach a token if one can be found, then behave like [`Decision::Forward`].
    AttachToken,
}

/// Middleware that attaches bearer tokens to resource-server requests.
///
/// Cheap to clone; collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct RequestAuthorizer {
    config: Arc<AuthorizerConfig>,
    tokens: Arc<dyn TokenProvider>,
    error_handler: Arc<dyn ResourceServerErrorHandler>,
    token_wait: Duration,
}

impl std::fmt::Debug for RequestAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthorizer")
            .field("config", &self.config)
            .field("token_wait", &self.token_wait)
            .finish_non_exhaustive()
    }
}

impl RequestAuthorizer {
    /// Creates an authorizer that reports failures through [`NoopErrorHandler`].
    ///
    /// # Arguments
    ///
    /// * `config` - Resource-server configuration, or `AuthorizerConfig::NoConfig`
    /// * `tokens` - Source of the current access token and its events
    pub fn new(config: impl Into<AuthorizerConfig>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            config: Arc::new(config.into()),
            tokens,
            error_handler: Arc::new(NoopErrorHandler),
            token_wait: WAIT_FOR_TOKEN_RECEIVED,
        }
    }

    /// Replaces the error handler.
    #[must_use]
    pub fn with_error_handler(mut self, error_handler: Arc<dyn ResourceServerErrorHandler>) -> Self {
        self.error_handler = error_handler;
        self
    }

    /// Sets how long to wait for `token_received` when no token is held.
    #[must_use]
    pub const fn with_token_wait(mut self, token_wait: Duration) -> Self {
        self.token_wait = token_wait;
        self
    }

    /// The configuration this authorizer decides with.
    #[must_use]
    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    /// The bound on waiting for a token.
    #[must_use]
    pub const fn token_wait(&self) -> Duration {
        self.token_wait
    }

    /// Decides how a request to `url` is handled.
    ///
    /// An empty URL is passed through. Otherwise the configuration decides:
    /// no resource server or a URL outside the allow-list passes through,
    /// `send_access_token = false` forwards without a token.
    #[must_use]
    pub fn decide(&self, url: &str) -> Decision {
        if url.is_empty() {
            return Decision::PassThrough;
        }

        match self.config.as_ref() {
            AuthorizerConfig::NoConfig | AuthorizerConfig::NoResourceServer => {
                Decision::PassThrough
            }
            AuthorizerConfig::ResourceServer(config) if !config.allows(url) => {
                Decision::PassThrough
            }
            AuthorizerConfig::ResourceServer(config) if !config.send_access_token => {
                Decision::Forward
            }
            AuthorizerConfig::ResourceServer(_) => Decision::AttachToken,
        }
    }

    /// Runs one request through the authorizer.
    ///
    /// `forward` sends the (possibly modified) request downstream. It is
    /// called exactly once.
    ///
    /// # Errors
    ///
    /// On [`Decision::PassThrough`] errors from `forward` are returned as-is.
    /// Otherwise the error handler decides the outcome.
    pub async fn authorize<F, Fut>(
        &self,
        request: Request,
        forward: F,
    ) -> reqwest_middleware::Result<Response>
    where
        F: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = reqwest_middleware::Result<Response>> + Send,
    {
        let decision = self.decide(request.url().as_str());
        trace!(url = %request.url(), ?decision, "Authorizing request");

        match decision {
            Decision::PassThrough => forward(request).await,
            Decision::Forward => self.forward_with_recovery(request, forward).await,
            Decision::AttachToken => {
                let request = match self.resolve_token().await {
                    Some(token) => attach_bearer(request, &token),
                    None => request,
                };
                self.forward_with_recovery(request, forward).await
            }
        }
    }

    /// Finds the token to attach, waiting for `token_received` if needed.
    ///
    /// Returns `None` if the wait times out, the event stream closes, or the
    /// token read after the event is empty.
    async fn resolve_token(&self) -> Option<SecretString> {
        // Subscribe before the first read so an event landing in between is kept.
        let mut events = self.tokens.subscribe();

        tokio::select! {
            biased;

            Some(token) = future::ready(self.current_token()) => {
                trace!("Using access token held at request time");
                Some(token)
            }

            received = time::timeout(self.token_wait, self.next_token_received(&mut events)) => {
                match received {
                    Ok(token) => token,
                    Err(_) => {
                        let error = AuthorizerError::TokenWaitTimeout(self.token_wait);
                        debug!(%error, "Sending request without access token");
                        None
                    }
                }
            }
        }
    }

    /// Waits for the next `token_received` event and reads the token again.
    async fn next_token_received(
        &self,
        events: &mut broadcast::Receiver<AuthEvent>,
    ) -> Option<SecretString> {
        loop {
            match events.recv().await {
                Ok(event) if event.is_token_received() => {
                    let token = self.current_token();
                    if token.is_none() {
                        debug!("Token received event fired but no access token is held");
                    }
                    return token;
                }
                Ok(event) => {
                    trace!(event = %event.kind(), "Ignoring auth event while waiting for token");
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Auth event stream lagged, re-reading access token");
                    if let Some(token) = self.current_token() {
                        return Some(token);
                    }
                }
                Err(RecvError::Closed) => {
                    debug!("Auth event stream closed before a token arrived");
                    return None;
                }
            }
        }
    }

    fn current_token(&self) -> Option<SecretString> {
        self.tokens
            .access_token()
            .filter(|token| !token.expose_secret().is_empty())
    }

    async fn forward_with_recovery<F, Fut>(
        &self,
        request: Request,
        forward: F,
    ) -> reqwest_middleware::Result<Response>
    where
        F: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = reqwest_middleware::Result<Response>> + Send,
    {
        let url = request.url().clone();

        let error = match forward(request).await {
            Ok(response) if is_error_status(&response) => TransportError::Status(response),
            Ok(response) => return Ok(response),
            Err(error) => TransportError::Request(error),
        };

        warn!(%url, %error, "Resource server request failed, delegating to error handler");
        self.error_handler.handle_error(error).await
    }
}

#[async_trait]
impl Middleware for RequestAuthorizer {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.authorize(req, move |req| next.run(req, extensions))
            .await
    }
}

fn is_error_status(response: &Response) -> bool {
    let status = response.status();
    status.is_client_error() || status.is_server_error()
}

fn bearer_header(token: &SecretString) -> Result<HeaderValue, AuthorizerError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|_| AuthorizerError::InvalidToken)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Sets `Authorization: Bearer <token>`, replacing any existing value.
fn attach_bearer(mut request: Request, token: &SecretString) -> Request {
    match bearer_header(token) {
        Ok(value) => {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(error) => {
            warn!(url = %request.url(), %error, "Sending request without access token");
        }
    }
    request
}
