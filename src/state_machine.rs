//! Exchange state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! runtime feeds events in, gets a new state plus effects back, and performs
//! the effects against the transcript and the session synchronizer.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, ExchangeOutcome};
pub use state::{ChatContext, ExchangeState};
pub use transition::{transition, TransitionError, TransitionResult};
