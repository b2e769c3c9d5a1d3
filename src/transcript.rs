//! Transcript store
//!
//! Owns the ordered, append-only list of messages and the pending flag. This is
//! the single source of truth for what a front end renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal message id, strictly increasing in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// A single transcript entry. Only the transcript can create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered message history plus the "reply pending" flag
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    pending: bool,
    next_id: u64,
    greeting: String,
    error_prefix: String,
}

impl Transcript {
    pub fn new(greeting: impl Into<String>, error_prefix: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            pending: false,
            next_id: 1,
            greeting: greeting.into(),
            error_prefix: error_prefix.into(),
        }
    }

    /// Append the greeting as the first entry.
    ///
    /// Returns `None` if the transcript was already initialized.
    pub fn initialize(&mut self) -> Option<&Message> {
        if !self.messages.is_empty() {
            tracing::debug!("Transcript already initialized");
            return None;
        }
        let greeting = self.greeting.clone();
        Some(self.append(Sender::Bot, greeting))
    }

    /// Optimistically append a user message and mark a reply as pending.
    ///
    /// Blank input and submissions while a reply is pending are ignored and
    /// return `None`. On success the submitted text is handed back for the
    /// outbound request.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() || self.pending {
            return None;
        }
        self.append(Sender::User, text.to_string());
        self.pending = true;
        Some(text.to_string())
    }

    /// Append the bot's reply and clear the pending flag
    pub fn resolve(&mut self, reply_text: impl Into<String>) -> &Message {
        self.pending = false;
        self.append(Sender::Bot, reply_text.into())
    }

    /// Append a bot-authored error entry and clear the pending flag
    pub fn resolve_with_error(&mut self, display_text: &str) -> &Message {
        self.pending = false;
        let text = format!("{}{display_text}", self.error_prefix);
        self.append(Sender::Bot, text)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether `text` carries this transcript's error marker
    pub fn is_error_text(&self, text: &str) -> bool {
        text.starts_with(&self.error_prefix)
    }

    fn append(&mut self, sender: Sender, text: String) -> &Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            text,
            sender,
            created_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }
}
