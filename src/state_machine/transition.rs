//! Pure state transition function
//!
//! Idle + submit -> AwaitingReply (append user message, send request)
//! AwaitingReply + success -> Idle (adopt identity, append reply)
//! AwaitingReply + failure -> Idle (append error entry)

use super::{ChatContext, Effect, Event, ExchangeOutcome, ExchangeState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ExchangeState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ExchangeState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events the machine refuses. None of these change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still pending")]
    ExchangeInFlight,
    #[error("No exchange is in flight")]
    NoExchangeInFlight,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs no
/// I/O.
pub fn transition(
    state: ExchangeState,
    context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Blank input is ignored regardless of state
        (_, Event::UserSubmit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        (ExchangeState::Idle, Event::UserSubmit { text }) => {
            Ok(TransitionResult::new(ExchangeState::AwaitingReply).with_effects([
                Effect::AppendUserMessage { text: text.clone() },
                Effect::SendRequest { text },
            ]))
        }

        // No queueing: a second submission is simply dropped
        (ExchangeState::AwaitingReply, Event::UserSubmit { .. }) => {
            Err(TransitionError::ExchangeInFlight)
        }

        (
            ExchangeState::AwaitingReply,
            Event::ExchangeSettled {
                outcome: ExchangeOutcome::Success { reply, session_id },
            },
        ) => {
            let mut result = TransitionResult::new(ExchangeState::Idle);
            if let Some(session_id) = session_id {
                result = result.with_effect(Effect::AdoptIdentity { session_id });
            }
            Ok(result.with_effect(Effect::AppendReply { text: reply }))
        }

        (
            ExchangeState::AwaitingReply,
            Event::ExchangeSettled {
                outcome: ExchangeOutcome::Failure { kind, detail, status },
            },
        ) => {
            let text = context
                .strings
                .describe_failure(kind, detail.as_deref(), status);
            Ok(TransitionResult::new(ExchangeState::Idle).with_effect(Effect::AppendError { text }))
        }

        (ExchangeState::Idle, Event::ExchangeSettled { .. }) => {
            Err(TransitionError::NoExchangeInFlight)
        }
    }
}
