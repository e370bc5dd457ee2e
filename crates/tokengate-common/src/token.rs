//! Access to the current access token and its lifecycle events.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::trace;

use crate::events::AuthEvent;

/// Capacity of the event channel used by [`SharedTokenStore`].
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Source of access tokens.
///
/// Implemented by whatever owns the token lifecycle (login flow, refresh
/// loop). Consumers only read: they never store or clear tokens through this
/// interface.
pub trait TokenProvider: Send + Sync {
    /// Returns the access token held right now, if any.
    ///
    /// The value may change between calls. An empty token is possible and
    /// callers should treat it like `None`.
    fn access_token(&self) -> Option<SecretString>;

    /// Subscribes to lifecycle events.
    ///
    /// Events published before the call are not delivered.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// In-memory token holder that publishes lifecycle events.
///
/// Clones share the same token and channel. Nothing is persisted.
#[derive(Clone)]
pub struct SharedTokenStore {
    token: Arc<RwLock<Option<SecretString>>>,
    events: broadcast::Sender<AuthEvent>,
}

// Custom Debug implementation to avoid exposing the token
impl std::fmt::Debug for SharedTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTokenStore")
            .field("token", &"[REDACTED]")
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl Default for SharedTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            token: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Stores a token and announces it with [`AuthEvent::TokenReceived`].
    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = SecretString::from(token.into());
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        self.emit(AuthEvent::TokenReceived);
    }

    /// Discards the token and announces [`AuthEvent::Logout`].
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.emit(AuthEvent::Logout);
    }

    /// Publishes an event to current subscribers.
    pub fn emit(&self, event: AuthEvent) {
        let kind = event.kind();
        if self.events.send(event).is_err() {
            trace!(event = %kind, "No subscribers for auth event");
        }
    }

    /// Number of live event subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl TokenProvider for SharedTokenStore {
    fn access_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
