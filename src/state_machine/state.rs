//! Exchange state types

use crate::config::Strings;
use serde::{Deserialize, Serialize};

/// Where the single in-flight exchange stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeState {
    /// Ready for user input
    #[default]
    Idle,

    /// User message appended, request in flight
    AwaitingReply,
}

impl ExchangeState {
    pub fn is_pending(self) -> bool {
        matches!(self, ExchangeState::AwaitingReply)
    }
}

/// Context for a chat session (immutable configuration)
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub strings: Strings,
}

impl ChatContext {
    pub fn new(strings: Strings) -> Self {
        Self { strings }
    }
}
