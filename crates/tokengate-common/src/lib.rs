//! # tokengate-common
//!
//! Shared types for attaching OAuth bearer tokens to outgoing HTTP requests.
//!
//! This crate provides the pieces the request authorizer consumes but does not own:
//! - Resource-server configuration (which URLs get a token, and whether to send one)
//! - Auth events published by the token lifecycle
//! - The token provider interface plus a simple in-memory store
//!
//! ## Example
//!
//! ```
//! use tokengate_common::{AuthorizerConfig, ModuleConfig, ResourceServerConfig, SharedTokenStore, TokenProvider};
//!
//! let config: AuthorizerConfig = Some(ModuleConfig {
//!     resource_server: Some(ResourceServerConfig {
//!         allowed_urls: Some(vec!["https://api.example.com/".to_string()]),
//!         send_access_token: true,
//!     }),
//! })
//! .into();
//! assert!(config.resource_server().is_some());
//!
//! let store = SharedTokenStore::new();
//! store.set_access_token("abc");
//! assert!(store.access_token().is_some());
//! ```

/// Resource-server configuration and its loaded forms.
pub mod config;
/// Auth events emitted by the token lifecycle.
pub mod events;
/// Token provider interface and the in-memory store.
pub mod token;

pub use config::{AuthorizerConfig, ConfigError, ModuleConfig, ResourceServerConfig};
pub use events::{AuthEvent, AuthEventKind};
pub use token::{SharedTokenStore, TokenProvider};
