//! # tokengate-client
//!
//! `reqwest` middleware that attaches OAuth bearer tokens to requests bound
//! for a resource server.
//!
//! The crate covers one concern: given a request, decide whether it should
//! carry the current access token, obtain the token (waiting briefly if login
//! is still in flight) and hand failures to a pluggable error handler. Token
//! refresh, storage and retry policy belong to the collaborators.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tokengate_client::{RequestAuthorizer, build_client};
//! use tokengate_common::{ModuleConfig, SharedTokenStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ModuleConfig::from_toml_str(
//!     r#"
//!     [resource_server]
//!     allowed_urls = ["https://api.example.com/"]
//!     send_access_token = true
//!     "#,
//! )?;
//!
//! let tokens = SharedTokenStore::new();
//! let authorizer = RequestAuthorizer::new(config, Arc::new(tokens.clone()));
//! let client = build_client(authorizer, Some(Duration::from_secs(30)))?;
//!
//! tokens.set_access_token("abc");
//! let response = client.get("https://api.example.com/flights").send().await?;
//! println!("Status: {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod authorizer;
pub mod client;
pub mod error;
pub mod error_handler;

pub use authorizer::{Decision, RequestAuthorizer, WAIT_FOR_TOKEN_RECEIVED};
pub use client::{build_client, wrap_client};
pub use error::{AuthorizerError, TransportError};
pub use error_handler::{NoopErrorHandler, ResourceServerErrorHandler};
