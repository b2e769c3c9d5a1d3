//! HTTP implementation of the chat service

use super::{ChatRequest, ChatResponse, ChatService, ClientError, ErrorBody};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Fixed path of the chat endpoint, appended to the configured base URL
pub const CHAT_PATH: &str = "/api/chat";

/// `POST {base_url}/api/chat` over reqwest
pub struct HttpChatService {
    client: Client,
    endpoint: String,
}

impl HttpChatService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}{CHAT_PATH}", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail_text().map(str::to_string));
            tracing::error!(status = status.as_u16(), body = %body, "Chat service returned error status");
            return Err(ClientError::server(status.as_u16(), detail));
        }

        serde_json::from_str::<ChatResponse>(&body).map_err(|e| {
            ClientError::malformed(format!("Failed to parse chat response: {e}"))
                .with_status(status.as_u16())
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
