//! Chat runtime executor

use super::traits::{ChatService, SessionStore};
use super::{ChatHandle, ChatUpdate};

use crate::client::ClientErrorKind;
use crate::session::SessionSync;
use crate::state_machine::{
    transition, ChatContext, Effect, Event, ExchangeOutcome, ExchangeState, TransitionError,
};
use crate::transcript::{Message, Transcript};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Generic chat runtime that works with any chat service and session store
pub struct ChatRuntime<C, K>
where
    C: ChatService + 'static,
    K: SessionStore,
{
    context: ChatContext,
    state: ExchangeState,
    transcript: Transcript,
    session: SessionSync<K>,
    service: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    /// Outcomes of background requests come back here
    outcome_tx: mpsc::UnboundedSender<ExchangeOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ExchangeOutcome>,
    broadcast_tx: broadcast::Sender<ChatUpdate>,
    identity_tx: watch::Sender<Option<String>>,
}

impl<C, K> ChatRuntime<C, K>
where
    C: ChatService + 'static,
    K: SessionStore,
{
    pub fn new(
        context: ChatContext,
        session: SessionSync<K>,
        service: C,
        event_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<ChatUpdate>,
    ) -> Self {
        let transcript = Transcript::new(
            context.strings.greeting.clone(),
            context.strings.error_prefix.clone(),
        );
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (identity_tx, _) = watch::channel(session.current_identity().map(str::to_string));
        Self {
            context,
            state: ExchangeState::Idle,
            transcript,
            session,
            service: Arc::new(service),
            event_rx,
            outcome_tx,
            outcome_rx,
            broadcast_tx,
            identity_tx,
        }
    }

    /// Create a runtime together with its handle and a receiver that already
    /// sees the greeting.
    pub fn create(
        context: ChatContext,
        session: SessionSync<K>,
        service: C,
    ) -> (Self, ChatHandle, broadcast::Receiver<ChatUpdate>) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);
        let runtime = Self::new(context, session, service, event_rx, broadcast_tx.clone());
        let handle = ChatHandle {
            event_tx,
            broadcast_tx,
            identity_rx: runtime.identity_tx.subscribe(),
        };
        (runtime, handle, broadcast_rx)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Run until every handle is dropped and no exchange is in flight.
    ///
    /// Returns the final transcript.
    pub async fn run(mut self) -> Transcript {
        tracing::info!(
            endpoint = %self.service.endpoint(),
            session_id = ?self.session.current_identity(),
            "Starting chat runtime"
        );

        if let Some(greeting) = self.transcript.initialize().cloned() {
            self.notify_message(greeting);
        }

        let mut inputs_open = true;
        loop {
            tokio::select! {
                event = self.event_rx.recv(), if inputs_open => match event {
                    Some(event) => self.process_event(event).await,
                    None => {
                        tracing::debug!("All chat handles dropped");
                        inputs_open = false;
                    }
                },
                Some(outcome) = self.outcome_rx.recv() => {
                    self.process_event(Event::ExchangeSettled { outcome }).await;
                }
                else => break,
            }

            // An in-flight exchange always gets its resolution first
            if !inputs_open && !self.state.is_pending() {
                break;
            }
        }

        tracing::info!(messages = self.transcript.len(), "Chat runtime stopped");
        self.transcript
    }

    async fn process_event(&mut self, event: Event) {
        let result = match transition(self.state, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::NoExchangeInFlight) => {
                tracing::warn!("Discarding exchange outcome with no exchange in flight");
                return;
            }
            Err(e) => {
                // Blank or concurrent submissions are dropped without a trace
                // in the transcript
                tracing::debug!(reason = %e, "Ignoring submission");
                return;
            }
        };

        let was_pending = self.state.is_pending();
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        debug_assert_eq!(self.transcript.is_pending(), self.state.is_pending());
        if was_pending != self.state.is_pending() {
            let _ = self.broadcast_tx.send(ChatUpdate::Pending {
                pending: self.state.is_pending(),
            });
        }
    }

    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendUserMessage { text } => {
                if self.transcript.submit(&text).is_none() {
                    tracing::warn!("Transcript refused a submission the state machine accepted");
                    return;
                }
                if let Some(message) = self.transcript.last().cloned() {
                    self.notify_message(message);
                }
            }

            Effect::SendRequest { text } => {
                let request = self.session.build_request(text);
                let service = self.service.clone();
                let outcome_tx = self.outcome_tx.clone();

                tokio::spawn(async move {
                    tracing::debug!(
                        new_session = request.session_id.is_none(),
                        "Sending chat request (background)"
                    );

                    // Inner task so a panicking service still settles the exchange
                    let call = tokio::spawn(async move { service.send(&request).await });
                    let outcome = match call.await {
                        Ok(result) => ExchangeOutcome::from(result),
                        Err(e) => {
                            tracing::error!(error = %e, "Chat request task failed");
                            ExchangeOutcome::Failure {
                                kind: ClientErrorKind::Transport,
                                detail: None,
                                status: None,
                            }
                        }
                    };

                    if outcome_tx.send(outcome).is_err() {
                        tracing::debug!("Runtime gone, dropping exchange outcome");
                    }
                });
            }

            Effect::AdoptIdentity { session_id } => {
                if self.session.adopt_identity(&session_id).await {
                    self.identity_tx.send_replace(Some(session_id.clone()));
                    let _ = self
                        .broadcast_tx
                        .send(ChatUpdate::IdentityChanged { session_id });
                }
            }

            Effect::AppendReply { text } => {
                let message = self.transcript.resolve(text).clone();
                self.notify_message(message);
            }

            Effect::AppendError { text } => {
                let message = self.transcript.resolve_with_error(&text).clone();
                self.notify_message(message);
            }
        }
    }

    fn notify_message(&self, message: Message) {
        let _ = self.broadcast_tx.send(ChatUpdate::Message { message });
    }
}
