//! Events that can occur in a chat session

use crate::client::{ChatResponse, ClientError, ClientErrorKind};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// The user submitted a line of text
    UserSubmit { text: String },

    /// The outbound request finished, one way or the other
    ExchangeSettled { outcome: ExchangeOutcome },
}

impl Event {
    pub fn user_submit(text: impl Into<String>) -> Self {
        Event::UserSubmit { text: text.into() }
    }
}

/// Result of one round trip with the chat service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Success {
        reply: String,
        /// Never empty: built from [`ChatResponse::identity`]
        session_id: Option<String>,
    },
    Failure {
        kind: ClientErrorKind,
        /// Server-supplied explanation, shown verbatim
        detail: Option<String>,
        status: Option<u16>,
    },
}

impl From<Result<ChatResponse, ClientError>> for ExchangeOutcome {
    fn from(result: Result<ChatResponse, ClientError>) -> Self {
        match result {
            Ok(response) => {
                let session_id = response.identity().map(str::to_string);
                ExchangeOutcome::Success {
                    reply: response.message,
                    session_id,
                }
            }
            Err(e) => ExchangeOutcome::Failure {
                kind: e.kind,
                detail: e.detail,
                status: e.status,
            },
        }
    }
}
