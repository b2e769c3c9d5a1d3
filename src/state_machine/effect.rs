//! Effects produced by state transitions

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Optimistically append the user's message (marks the transcript pending)
    AppendUserMessage { text: String },

    /// Issue one outbound request carrying the current session identity
    SendRequest { text: String },

    /// Persist and adopt a server-assigned identity. Always ordered before the
    /// reply is appended.
    AdoptIdentity { session_id: String },

    /// Append the bot's reply (clears pending)
    AppendReply { text: String },

    /// Append a bot-authored error entry (clears pending)
    AppendError { text: String },
}

impl Effect {
    /// Whether this effect ends the exchange in the transcript
    pub fn is_resolution(&self) -> bool {
        matches!(self, Effect::AppendReply { .. } | Effect::AppendError { .. })
    }
}
