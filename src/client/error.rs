//! Chat client error types

use thiserror::Error;

/// Failure of a single exchange with the chat service
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Server-supplied `detail`, the only part of an error meant for the user
    pub detail: Option<String>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            detail: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Transport, message)
    }

    /// Non-success status; without a `detail` the message names the status
    pub fn server(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .clone()
            .unwrap_or_else(|| format!("HTTP error {status}"));
        Self {
            detail,
            ..Self::new(ClientErrorKind::Server, message).with_status(status)
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Malformed, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// No response received (connection refused, DNS, timeout)
    Transport,
    /// Non-success HTTP status
    Server,
    /// Success status but the body is not a chat response
    Malformed,
}

impl ClientErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Server => "server",
            Self::Malformed => "malformed",
        }
    }
}
