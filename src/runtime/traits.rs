//! Trait abstractions for runtime I/O
//!
//! The runtime is generic over the chat service and the session store so tests
//! can swap in mocks.

pub use crate::client::ChatService;
pub use crate::session::SessionStore;

use crate::client::{ChatRequest, ChatResponse, ClientError};
use crate::session::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatService + ?Sized> ChatService for Arc<T> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        (**self).send(request).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}
