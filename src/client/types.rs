//! Wire types for the chat endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /api/chat`
///
/// `session_id` is always serialized, as `null` for a new session, so the server
/// can tell a fresh conversation from a continuing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

/// Success body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatResponse {
    /// The server-assigned identity, treating an empty string as absent
    pub fn identity(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Body of a non-success response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// A string for application errors; FastAPI validation errors put an
    /// array of objects here instead.
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(Value::as_str)
            .filter(|d| !d.trim().is_empty())
    }
}
