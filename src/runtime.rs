//! Runtime for driving a chat session
//!
//! One task owns the transcript, the session synchronizer and the exchange
//! state. Front ends talk to it through a [`ChatHandle`] and observe it through
//! broadcast [`ChatUpdate`]s.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use traits::*;

use crate::state_machine::Event;
use crate::transcript::Message;
use tokio::sync::{broadcast, mpsc, watch};

/// Updates sent to observers (renderers)
#[derive(Debug, Clone)]
pub enum ChatUpdate {
    /// A message was appended to the transcript
    Message { message: Message },
    /// A reply started or stopped pending
    Pending { pending: bool },
    /// The server assigned a new session identity
    IdentityChanged { session_id: String },
}

/// Handle to interact with a running chat session
#[derive(Clone)]
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<ChatUpdate>,
    identity_rx: watch::Receiver<Option<String>>,
}

impl ChatHandle {
    /// Submit a line of user input.
    ///
    /// Blank input and input while a reply is pending are dropped by the
    /// runtime. Errors only if the runtime has stopped.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), String> {
        self.event_tx
            .send(Event::user_submit(text))
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Identity the runtime currently sends with requests.
    ///
    /// Follows adoption in memory, so it stays accurate when the session
    /// store could not be written.
    pub fn session_id(&self) -> Option<String> {
        self.identity_rx.borrow().clone()
    }

    /// Subscribe to transcript updates
    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.broadcast_tx.subscribe()
    }
}
