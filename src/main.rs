//! Portfolio chat - terminal client
//!
//! Reads lines from stdin, sends them to the chat service and prints the
//! replies. `/session` shows the current session identity, `/quit` or EOF ends
//! the session once any pending reply has arrived.

use portfolio_chat::client::{HttpChatService, LoggingChatService};
use portfolio_chat::config::{ClientConfig, SessionPersistence};
use portfolio_chat::runtime::{ChatRuntime, ChatUpdate};
use portfolio_chat::session::{FileSessionStore, MemorySessionStore, SessionStore, SessionSync};
use portfolio_chat::state_machine::ChatContext;
use portfolio_chat::transcript::{Message, Sender};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        base_url = %config.base_url,
        timeout_secs = config.request_timeout.as_secs(),
        session = ?config.session,
        "Configuration loaded"
    );

    let store: Arc<dyn SessionStore> = match &config.session {
        SessionPersistence::Memory => Arc::new(MemorySessionStore::new()),
        SessionPersistence::File(path) => Arc::new(FileSessionStore::new(path)),
    };
    let session = SessionSync::load(store).await;

    let service = LoggingChatService::new(HttpChatService::new(
        &config.base_url,
        config.request_timeout,
    )?);

    let (runtime, handle, mut updates) =
        ChatRuntime::create(ChatContext::new(config.strings()), session, service);
    let runtime_task = tokio::spawn(runtime.run());

    // The user's own lines are already on screen, so only bot entries print
    let renderer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ChatUpdate::Message { message }) if message.sender() == Sender::Bot => {
                    println!("{}", render(&message));
                }
                Ok(ChatUpdate::Pending { pending: true }) => println!("..."),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/session" => match handle.session_id() {
                Some(id) => println!("session: {id}"),
                None => println!("session: (none yet)"),
            },
            _ => handle.submit(line).await?,
        }
    }

    drop(handle);
    let transcript = runtime_task.await?;
    renderer.await?;
    tracing::info!(messages = transcript.len(), "Session ended");

    Ok(())
}

fn render(message: &Message) -> String {
    format!("bot> {}", message.text())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_chat=warn".into());

    // stderr keeps log lines out of the conversation on stdout
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
