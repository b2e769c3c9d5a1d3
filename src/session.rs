//! Session synchronizer
//!
//! Owns the server-assigned session identity: what to send with each request
//! and when to adopt a new value from a response. The server is authoritative;
//! the client never mints or derives an identity.

mod store;

pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};

use crate::client::{ChatRequest, ChatResponse};

/// Well-known key of the identity in the session store
pub const SESSION_ID_KEY: &str = "chat_session_id";

pub struct SessionSync<K> {
    store: K,
    current: Option<String>,
}

impl<K: SessionStore> SessionSync<K> {
    /// Restore the identity persisted earlier in this session, if any.
    ///
    /// An unreadable store is treated as "no identity": the server will mint
    /// a new one on the next exchange.
    pub async fn load(store: K) -> Self {
        let current = match store.get(SESSION_ID_KEY).await {
            Ok(value) => value.filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session identity, starting fresh");
                None
            }
        };

        if let Some(id) = &current {
            tracing::debug!(session_id = %id, "Restored session identity");
        }

        Self { store, current }
    }

    pub fn current_identity(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Request carrying the current identity (`None` for a new session)
    pub fn build_request(&self, message: impl Into<String>) -> ChatRequest {
        ChatRequest {
            message: message.into(),
            session_id: self.current.clone(),
        }
    }

    /// Adopt the identity carried by `response`, if any.
    ///
    /// Shorthand for [`adopt_identity`](Self::adopt_identity) on
    /// [`ChatResponse::identity`]; the runtime reaches the same call through
    /// the settled exchange outcome, which is built from that accessor.
    pub async fn absorb_response(&mut self, response: &ChatResponse) -> bool {
        match response.identity() {
            Some(id) => self.adopt_identity(id).await,
            None => false,
        }
    }

    /// Persist and adopt `session_id` when it differs from the current one.
    ///
    /// `session_id` comes from [`ChatResponse::identity`], which already drops
    /// empty values. Returns whether the identity changed. Adopting the current
    /// value again performs no store write.
    pub async fn adopt_identity(&mut self, session_id: &str) -> bool {
        if self.current.as_deref() == Some(session_id) {
            return false;
        }

        if let Err(e) = self.store.set(SESSION_ID_KEY, session_id).await {
            // Still adopt it: the conversation continues for this process
            tracing::warn!(error = %e, session_id = %session_id, "Failed to persist session identity");
        }

        tracing::info!(
            previous = ?self.current,
            session_id = %session_id,
            "Adopted session identity"
        );
        self.current = Some(session_id.to_string());
        true
    }

    pub fn store(&self) -> &K {
        &self.store
    }
}
