//! Chat service abstraction
//!
//! The outbound call to the reply service is a black box behind [`ChatService`]:
//! one request in, one response or one classified error out.

mod error;
mod http;
mod types;

pub use error::{ClientError, ClientErrorKind};
pub use http::{HttpChatService, CHAT_PATH};
pub use types::{ChatRequest, ChatResponse, ErrorBody};

use async_trait::async_trait;

/// Common interface for the reply-generating service
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send one message and wait for the reply
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    /// Human-readable target, for logs
    fn endpoint(&self) -> &str;
}

/// Logging wrapper for chat services
pub struct LoggingChatService<C> {
    inner: C,
}

impl<C: ChatService> LoggingChatService<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ChatService> ChatService for LoggingChatService<C> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let start = std::time::Instant::now();
        let result = self.inner.send(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    new_session = request.session_id.is_none(),
                    reply_len = response.message.len(),
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    status = ?e.status,
                    error = %e.message,
                    "Chat request failed"
                );
            }
        }

        result
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}
