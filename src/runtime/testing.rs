//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{ChatHandle, ChatRuntime, ChatUpdate};
use crate::client::{ChatRequest, ChatResponse, ClientError};
use crate::config::{Locale, Strings};
use crate::session::{SessionSync, StoreError};
use crate::state_machine::ChatContext;
use crate::transcript::{Message, Transcript};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Chat Service
// ============================================================================

/// Mock chat service that returns queued responses
pub struct MockChatService {
    responses: Mutex<VecDeque<Result<ChatResponse, ClientError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_reply(&self, message: &str, session_id: Option<&str>) {
        self.responses.lock().unwrap().push_back(Ok(ChatResponse {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
        }));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: ClientError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Session ids carried by the recorded requests, in order
    pub fn sent_identities(&self) -> Vec<Option<String>> {
        self.recorded_requests()
            .into_iter()
            .map(|r| r.session_id)
            .collect()
    }

    fn next(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("No mock response queued")))
    }
}

impl Default for MockChatService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatService {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.next(request)
    }

    fn endpoint(&self) -> &str {
        "mock://chat"
    }
}

// ============================================================================
// Delayed Mock Chat Service (for in-flight testing)
// ============================================================================

/// Mock chat service with configurable delay
pub struct DelayedMockChatService {
    pub inner: MockChatService,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockChatService {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockChatService::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl ChatService for DelayedMockChatService {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next(request)
    }

    fn endpoint(&self) -> &str {
        "mock://chat-delayed"
    }
}

/// Chat service whose request task panics
pub struct PanickingChatService;

#[async_trait]
impl ChatService for PanickingChatService {
    async fn send(&self, _request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        panic!("chat service exploded");
    }

    fn endpoint(&self) -> &str {
        "mock://chat-panicking"
    }
}

// ============================================================================
// Counting Session Store
// ============================================================================

/// In-memory session store that counts writes
#[derive(Default)]
pub struct CountingStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `set` fail with an I/O error
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::Io {
                path: "counting-store".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime<C: ChatService + 'static> {
    handle: Option<ChatHandle>,
    pub updates: broadcast::Receiver<ChatUpdate>,
    pub service: Arc<C>,
    pub store: Arc<CountingStore>,
    /// Messages seen on the update stream so far
    pub messages: Vec<Message>,
    /// Identity changes seen on the update stream so far
    pub identity_changes: Vec<String>,
    runtime_task: tokio::task::JoinHandle<Transcript>,
}

impl TestRuntime<MockChatService> {
    /// Create a simple test runtime with an instant mock
    pub fn new() -> TestRuntimeBuilder<MockChatService> {
        TestRuntimeBuilder::new(MockChatService::new())
    }
}

pub struct TestRuntimeBuilder<C> {
    service: C,
    store: Arc<CountingStore>,
    strings: Strings,
}

impl<C: ChatService + 'static> TestRuntimeBuilder<C> {
    pub fn new(service: C) -> Self {
        Self {
            service,
            store: Arc::new(CountingStore::new()),
            strings: Strings::for_locale(Locale::En),
        }
    }

    pub fn store(mut self, store: Arc<CountingStore>) -> Self {
        self.store = store;
        self
    }

    pub async fn build(self) -> TestRuntime<C> {
        let service = Arc::new(self.service);
        let session = SessionSync::load(self.store.clone()).await;
        let context = ChatContext::new(self.strings);

        let (runtime, handle, updates) = ChatRuntime::create(context, session, service.clone());
        let runtime_task = tokio::spawn(runtime.run());

        TestRuntime {
            handle: Some(handle),
            updates,
            service,
            store: self.store,
            messages: Vec::new(),
            identity_changes: Vec::new(),
            runtime_task,
        }
    }
}

impl<C: ChatService + 'static> TestRuntime<C> {
    /// Send user input to the runtime
    pub async fn send_message(&self, text: &str) {
        self.handle
            .as_ref()
            .expect("runtime already shut down")
            .submit(text)
            .await
            .expect("Failed to send message");
    }

    /// Identity the runtime will send with the next request
    pub fn session_id(&self) -> Option<String> {
        self.handle
            .as_ref()
            .expect("runtime already shut down")
            .session_id()
    }

    /// Wait until the pending flag takes `pending`, recording updates on the way
    pub async fn wait_for_pending(&mut self, pending: bool, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(update)) => {
                    if self.record(update) == Some(pending) {
                        return true;
                    }
                }
                Ok(Err(_)) | Err(_) => continue,
            }
        }
        false
    }

    /// Wait for the current exchange to settle
    pub async fn wait_for_idle(&mut self, timeout: Duration) -> bool {
        self.wait_for_pending(false, timeout).await
    }

    /// Submit and wait for the reply
    pub async fn exchange(&mut self, text: &str) {
        self.send_message(text).await;
        assert!(
            self.wait_for_idle(Duration::from_secs(2)).await,
            "exchange did not settle"
        );
    }

    /// Drop the handle and wait for the runtime to finish
    pub async fn shutdown(mut self) -> Transcript {
        self.handle = None;
        tokio::time::timeout(Duration::from_secs(2), self.runtime_task)
            .await
            .expect("runtime did not stop")
            .expect("runtime panicked")
    }

    /// Returns the new pending value for `Pending` updates
    fn record(&mut self, update: ChatUpdate) -> Option<bool> {
        match update {
            ChatUpdate::Message { message } => {
                self.messages.push(message);
                None
            }
            ChatUpdate::IdentityChanged { session_id } => {
                self.identity_changes.push(session_id);
                None
            }
            ChatUpdate::Pending { pending } => Some(pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SESSION_ID_KEY;
    use crate::transcript::Sender;

    #[tokio::test]
    async fn test_mock_chat_service() {
        let mock = MockChatService::new();
        mock.queue_reply("Hello", Some("S1"));

        let request = ChatRequest {
            message: "hi".to_string(),
            session_id: None,
        };

        let response = mock.send(&request).await.unwrap();
        assert_eq!(response.message, "Hello");

        // Second call should fail (no more responses)
        assert!(mock.send(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    /// Integration test: simple reply
    #[tokio::test]
    async fn test_simple_reply() {
        let mut rt = TestRuntime::new().build().await;
        rt.service.queue_reply("Hi there!", Some("S1"));

        rt.exchange("Hello").await;

        let msgs = &rt.messages;
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].sender(), Sender::Bot);
        assert_eq!(msgs[1].sender(), Sender::User);
        assert_eq!(msgs[1].text(), "Hello");
        assert_eq!(msgs[2].sender(), Sender::Bot);
        assert_eq!(msgs[2].text(), "Hi there!");
        assert_eq!(rt.identity_changes, vec!["S1".to_string()]);
    }

    /// Greeting then exactly two entries per exchange, in order
    #[tokio::test]
    async fn test_sequential_exchanges_keep_order() {
        let mut rt = TestRuntime::new().build().await;
        for i in 0..5 {
            if i == 2 {
                rt.service.queue_error(ClientError::server(500, Some("backend down".to_string())));
            } else {
                rt.service.queue_reply(&format!("reply {i}"), Some("S1"));
            }
        }

        for i in 0..5 {
            rt.exchange(&format!("question {i}")).await;
        }

        let transcript = rt.shutdown().await;
        let msgs = transcript.messages();
        assert_eq!(msgs.len(), 11);
        assert_eq!(msgs[0].text(), "Hello! Ask me anything about myself.");
        for i in 0..5 {
            let user = &msgs[1 + i * 2];
            let bot = &msgs[2 + i * 2];
            assert_eq!(user.sender(), Sender::User);
            assert_eq!(user.text(), format!("question {i}"));
            assert_eq!(bot.sender(), Sender::Bot);
            if i == 2 {
                assert_eq!(bot.text(), "Error: backend down");
            } else {
                assert_eq!(bot.text(), format!("reply {i}"));
            }
        }
        assert!(msgs.windows(2).all(|w| w[0].id() < w[1].id()));
    }

    #[tokio::test]
    async fn test_submission_while_pending_is_dropped() {
        let service = DelayedMockChatService::new(Duration::from_millis(300));
        service.inner.queue_reply("slow reply", Some("S1"));
        let started = service.request_started.clone();

        let mut rt = TestRuntimeBuilder::new(service).build().await;
        rt.send_message("first").await;
        started.notified().await;
        assert!(rt.wait_for_pending(true, Duration::from_secs(1)).await);

        rt.send_message("second").await;
        assert!(rt.wait_for_idle(Duration::from_secs(2)).await);

        assert_eq!(rt.service.inner.recorded_requests().len(), 1);
        let transcript = rt.shutdown().await;
        let texts: Vec<&str> = transcript.messages().iter().map(Message::text).collect();
        assert_eq!(
            texts,
            vec!["Hello! Ask me anything about myself.", "first", "slow reply"]
        );
        assert!(!transcript.is_pending());
    }

    #[tokio::test]
    async fn test_blank_submissions_do_nothing() {
        let mut rt = TestRuntime::new().build().await;
        rt.send_message("").await;
        rt.send_message("   ").await;

        // Nothing pending, so nothing to wait for
        assert!(!rt.wait_for_pending(true, Duration::from_millis(200)).await);
        assert!(rt.service.recorded_requests().is_empty());

        let transcript = rt.shutdown().await;
        assert_eq!(transcript.len(), 1);
        assert!(!transcript.is_pending());
    }

    #[tokio::test]
    async fn test_identity_continuity() {
        let mut rt = TestRuntime::new().build().await;
        rt.service.queue_reply("one", Some("A"));
        rt.service.queue_reply("two", Some("A"));
        rt.service.queue_reply("three", Some("B"));

        rt.exchange("1").await;
        rt.exchange("2").await;
        rt.exchange("3").await;

        assert_eq!(
            rt.service.sent_identities(),
            vec![None, Some("A".to_string()), Some("A".to_string())]
        );
        assert_eq!(rt.store.value(SESSION_ID_KEY).as_deref(), Some("B"));
        // "A" written once, "B" once
        assert_eq!(rt.store.write_count(), 2);
        assert_eq!(rt.identity_changes, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_first_exchange_identity() {
        let mut rt = TestRuntime::new().build().await;
        rt.service.queue_reply("welcome", Some("S1"));
        rt.service.queue_reply("again", Some("S1"));

        rt.exchange("hi").await;
        rt.exchange("hi again").await;

        assert_eq!(
            rt.service.sent_identities(),
            vec![None, Some("S1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_handle_reports_identity_when_store_writes_fail() {
        let store = Arc::new(CountingStore::new().failing_writes());
        let mut rt = TestRuntime::new().store(store.clone()).build().await;
        rt.service.queue_reply("one", Some("S1"));
        rt.service.queue_reply("two", Some("S1"));

        assert_eq!(rt.session_id(), None);
        rt.exchange("hi").await;
        rt.exchange("again").await;

        assert_eq!(store.value(SESSION_ID_KEY), None);
        assert_eq!(
            rt.service.sent_identities(),
            vec![None, Some("S1".to_string())]
        );
        assert_eq!(rt.session_id().as_deref(), Some("S1"));
    }

    #[tokio::test]
    async fn test_handle_starts_with_restored_identity() {
        let store = Arc::new(CountingStore::new());
        store.set(SESSION_ID_KEY, "S0").await.unwrap();

        let mut rt = TestRuntime::new().store(store).build().await;
        assert_eq!(rt.session_id().as_deref(), Some("S0"));

        rt.service.queue_reply("rotated", Some("S2"));
        rt.exchange("hi").await;
        assert_eq!(rt.session_id().as_deref(), Some("S2"));
    }

    #[tokio::test]
    async fn test_empty_identity_is_ignored() {
        let mut rt = TestRuntime::new().build().await;
        rt.service.queue_reply("no id yet", Some(""));
        rt.service.queue_reply("still none", None);

        rt.exchange("one").await;
        rt.exchange("two").await;

        assert_eq!(rt.service.sent_identities(), vec![None, None]);
        assert_eq!(rt.store.write_count(), 0);
        assert!(rt.identity_changes.is_empty());
        assert_eq!(rt.session_id(), None);
    }

    #[tokio::test]
    async fn test_transport_failure_round_trip() {
        let store = Arc::new(CountingStore::new());
        store.set(SESSION_ID_KEY, "S0").await.unwrap();
        let writes_before = store.write_count();

        let mut rt = TestRuntime::new().store(store.clone()).build().await;
        rt.service
            .queue_error(ClientError::transport("error sending request: connection refused"));

        rt.exchange("hello?").await;

        assert_eq!(rt.service.sent_identities(), vec![Some("S0".to_string())]);
        let transcript = rt.shutdown().await;
        let msgs = transcript.messages();
        assert_eq!(msgs.len(), 3);
        let last = &msgs[2];
        assert_eq!(last.sender(), Sender::Bot);
        assert_eq!(
            last.text(),
            "Error: An unknown error occurred while sending the message."
        );
        assert!(transcript.is_error_text(last.text()));
        assert!(!transcript.is_pending());

        assert_eq!(store.value(SESSION_ID_KEY).as_deref(), Some("S0"));
        assert_eq!(store.write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_recovers_after_failure() {
        let mut rt = TestRuntime::new().build().await;
        rt.service.queue_error(ClientError::malformed("expected value"));
        rt.service.queue_reply("back online", Some("S1"));

        rt.exchange("first").await;
        rt.exchange("second").await;

        let transcript = rt.shutdown().await;
        let texts: Vec<&str> = transcript.messages().iter().map(Message::text).collect();
        assert_eq!(
            texts[1..],
            [
                "first",
                "Error: Could not parse the response from the server.",
                "second",
                "back online"
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_service_still_settles() {
        let mut rt = TestRuntimeBuilder::new(PanickingChatService).build().await;
        rt.exchange("boom?").await;

        let transcript = rt.shutdown().await;
        assert_eq!(transcript.len(), 3);
        assert!(transcript.is_error_text(transcript.last().unwrap().text()));
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_exchange() {
        let service = DelayedMockChatService::new(Duration::from_millis(100));
        service.inner.queue_reply("late but here", None);
        let started = service.request_started.clone();

        let rt = TestRuntimeBuilder::new(service).build().await;
        rt.send_message("question").await;
        started.notified().await;

        let transcript = rt.shutdown().await;
        assert_eq!(transcript.last().unwrap().text(), "late but here");
        assert!(!transcript.is_pending());
    }
}
