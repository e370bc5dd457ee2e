//! Resource-server configuration for the request authorizer.
//!
//! Configuration is optional at every level. A missing file, or a file without a
//! `[resource_server]` table, means requests pass through untouched.
//!
//! ## Example Configuration
//!
//! ```toml
//! [resource_server]
//! allowed_urls = ["https://api.example.com/", "http://localhost:8080/"]
//! send_access_token = true
//! ```
//!
//! The camelCase spellings (`resourceServer`, `allowedUrls`,
//! `sendAccessToken`) are accepted as aliases.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration from disk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`ModuleConfig`].
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for the API the client talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceServerConfig {
    /// URL prefixes that receive a token. `None` applies to every URL.
    ///
    /// Request URLs are lower-cased before comparison; prefixes are used as written.
    #[serde(default, alias = "allowedUrls")]
    pub allowed_urls: Option<Vec<String>>,

    /// Whether an access token is attached at all (default: false)
    #[serde(default, alias = "sendAccessToken")]
    pub send_access_token: bool,
}

impl ResourceServerConfig {
    /// Returns `true` if `url` falls under the allow-list.
    ///
    /// An absent allow-list matches everything. An empty list matches nothing.
    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        self.allowed_urls.as_ref().is_none_or(|prefixes| {
            let url = url.to_lowercase();
            prefixes.iter().any(|prefix| url.starts_with(prefix.as_str()))
        })
    }
}

/// Top-level configuration as loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Resource-server section. Absent means pass-through.
    #[serde(default, alias = "resourceServer")]
    pub resource_server: Option<ResourceServerConfig>,
}

impl ModuleConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid configuration.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

/// Configuration as seen by the authorizer.
///
/// Collapses the optional layers of [`ModuleConfig`] into a single value so the
/// authorizer decides with one match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthorizerConfig {
    /// No configuration was supplied.
    #[default]
    NoConfig,
    /// Configuration exists but has no resource-server section.
    NoResourceServer,
    /// Resource-server settings are present.
    ResourceServer(ResourceServerConfig),
}

impl AuthorizerConfig {
    /// Returns the resource-server settings, if any.
    #[must_use]
    pub const fn resource_server(&self) -> Option<&ResourceServerConfig> {
        match self {
            Self::ResourceServer(config) => Some(config),
            Self::NoConfig | Self::NoResourceServer => None,
        }
    }
}

impl From<ModuleConfig> for AuthorizerConfig {
    fn from(config: ModuleConfig) -> Self {
        config
            .resource_server
            .map_or(Self::NoResourceServer, Self::ResourceServer)
    }
}

impl From<Option<ModuleConfig>> for AuthorizerConfig {
    fn from(config: Option<ModuleConfig>) -> Self {
        config.map_or(Self::NoConfig, Self::from)
    }
}

impl From<ResourceServerConfig> for AuthorizerConfig {
    fn from(config: ResourceServerConfig) -> Self {
        Self::ResourceServer(config)
    }
}
