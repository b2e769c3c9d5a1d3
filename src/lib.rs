//! Portfolio chat client
//!
//! Keeps an ordered transcript of a conversation with a remote reply service
//! and keeps the server-assigned session identity in sync across round trips.
//! A front end submits text through a [`runtime::ChatHandle`] and renders the
//! [`runtime::ChatUpdate`] stream.

pub mod client;
pub mod config;
pub mod runtime;
pub mod session;
pub mod state_machine;
pub mod transcript;

pub use client::{ChatService, HttpChatService, LoggingChatService};
pub use config::ClientConfig;
pub use runtime::{ChatHandle, ChatRuntime, ChatUpdate};
pub use session::{SessionStore, SessionSync};
pub use transcript::{Message, Sender, Transcript};
