//! Auth events published by the token lifecycle.
//!
//! The authorizer only reacts to [`AuthEvent::TokenReceived`]. The remaining
//! variants exist so a single stream can carry the whole lifecycle; other
//! subscribers (logout handling, session UI) consume them.
//!
//! Events carry no token material. Subscribers re-read the provider's
//! current snapshot when they need the token itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An event from the token lifecycle.
///
/// Serialized with a `type` tag in `snake_case`, e.g. `{"type":"token_received"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuthEvent {
    /// A new access token is available.
    TokenReceived,
    /// An existing access token was refreshed.
    TokenRefreshed,
    /// The current access token is about to expire.
    TokenExpires,
    /// Obtaining a token failed.
    TokenError {
        /// Human-readable reason
        reason: String,
    },
    /// Refreshing a token failed.
    TokenRefreshError {
        /// Human-readable reason
        reason: String,
    },
    /// The authorization server ended the session.
    SessionTerminated,
    /// The user logged out and the token was discarded.
    Logout,
}

/// Tag of an [`AuthEvent`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AuthEventKind {
    /// `token_received`
    TokenReceived,
    /// `token_refreshed`
    TokenRefreshed,
    /// `token_expires`
    TokenExpires,
    /// `token_error`
    TokenError,
    /// `token_refresh_error`
    TokenRefreshError,
    /// `session_terminated`
    SessionTerminated,
    /// `logout`
    Logout,
}

impl AuthEvent {
    /// Returns the tag of this event.
    #[must_use]
    pub const fn kind(&self) -> AuthEventKind {
        match self {
            Self::TokenReceived => AuthEventKind::TokenReceived,
            Self::TokenRefreshed => AuthEventKind::TokenRefreshed,
            Self::TokenExpires => AuthEventKind::TokenExpires,
            Self::TokenError { .. } => AuthEventKind::TokenError,
            Self::TokenRefreshError { .. } => AuthEventKind::TokenRefreshError,
            Self::SessionTerminated => AuthEventKind::SessionTerminated,
            Self::Logout => AuthEventKind::Logout,
        }
    }

    /// Returns `true` for [`AuthEvent::TokenReceived`].
    #[must_use]
    pub const fn is_token_received(&self) -> bool {
        matches!(self, Self::TokenReceived)
    }
}

impl AuthEventKind {
    /// Wire name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenReceived => "token_received",
            Self::TokenRefreshed => "token_refreshed",
            Self::TokenExpires => "token_expires",
            Self::TokenError => "token_error",
            Self::TokenRefreshError => "token_refresh_error",
            Self::SessionTerminated => "session_terminated",
            Self::Logout => "logout",
        }
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenError { reason } | Self::TokenRefreshError { reason } => {
                write!(f, "{}: {reason}", self.kind())
            }
            _ => write!(f, "{}", self.kind()),
        }
    }
}
