//! Client configuration
//!
//! Everything is read from the environment once at startup. Missing values fall
//! back to defaults that match a local development backend.

use crate::client::ClientErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fallback when `CHAT_API_BASE_URL` is unset
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Fallback when `CHAT_REQUEST_TIMEOUT_SECS` is unset
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("unsupported locale {0:?} (expected \"ja\" or \"en\")")]
    UnsupportedLocale(String),
}

/// Language of the user-visible strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    /// Parse a locale tag, accepting region suffixes like `ja_JP.UTF-8`
    pub fn parse(tag: &str) -> Result<Self, ConfigError> {
        let lang = tag
            .split(['_', '-', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "ja" => Ok(Locale::Ja),
            "en" => Ok(Locale::En),
            _ => Err(ConfigError::UnsupportedLocale(tag.to_string())),
        }
    }
}

/// User-visible strings produced by the client itself (never by the server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strings {
    pub greeting: String,
    /// Marker prepended to every error entry in the transcript
    pub error_prefix: String,
    pub transport_failure: String,
    pub malformed_response: String,
    /// Shown for a server error without a usable `detail`; `{status}` is
    /// replaced by the HTTP status code
    pub server_error: String,
}

impl Strings {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Ja => Self {
                greeting: "こんにちは！私について何でも聞いてください。".to_string(),
                error_prefix: "エラー: ".to_string(),
                transport_failure: "メッセージの送信中に不明なエラーが発生しました。".to_string(),
                malformed_response: "サーバーからの応答を解析できませんでした。".to_string(),
                server_error: "サーバーエラーが発生しました (HTTP {status})".to_string(),
            },
            Locale::En => Self {
                greeting: "Hello! Ask me anything about myself.".to_string(),
                error_prefix: "Error: ".to_string(),
                transport_failure: "An unknown error occurred while sending the message."
                    .to_string(),
                malformed_response: "Could not parse the response from the server.".to_string(),
                server_error: "HTTP error {status}".to_string(),
            },
        }
    }

    /// Text shown to the user for a failed exchange.
    ///
    /// Server errors carry the server's `detail` when it sent one, otherwise
    /// the localized status text. Transport and parse failures get a generic
    /// localized text; their raw cause only goes to the log.
    pub fn describe_failure(
        &self,
        kind: ClientErrorKind,
        detail: Option<&str>,
        status: Option<u16>,
    ) -> String {
        match (kind, detail) {
            (ClientErrorKind::Server, Some(detail)) => detail.to_string(),
            (ClientErrorKind::Server, None) => {
                let status = status.map_or_else(|| "?".to_string(), |s| s.to_string());
                self.server_error.replace("{status}", &status)
            }
            (ClientErrorKind::Transport, _) => self.transport_failure.clone(),
            (ClientErrorKind::Malformed, _) => self.malformed_response.clone(),
        }
    }
}

impl Default for Strings {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

/// Where the session identity is kept between runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPersistence {
    /// Identity lives only as long as the process
    Memory,
    /// Identity is written through to a session-scoped JSON file
    File(PathBuf),
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub locale: Locale,
    pub session: SessionPersistence,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            locale: Locale::default(),
            session: SessionPersistence::File(default_session_file()),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("CHAT_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout = match lookup("CHAT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: "CHAT_REQUEST_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let locale = match lookup("CHAT_LOCALE") {
            Some(tag) if !tag.trim().is_empty() => Locale::parse(tag.trim())?,
            _ => Locale::default(),
        };

        let persist = lookup("CHAT_PERSIST_SESSION")
            .map_or(true, |v| !matches!(v.trim(), "0" | "false" | "no" | "off"));

        let session = if persist {
            let path = lookup("CHAT_SESSION_FILE")
                .filter(|v| !v.trim().is_empty())
                .map_or_else(|| default_session_file_from(&lookup), PathBuf::from);
            SessionPersistence::File(path)
        } else {
            SessionPersistence::Memory
        };

        Ok(Self {
            base_url,
            request_timeout,
            locale,
            session,
        })
    }

    pub fn strings(&self) -> Strings {
        Strings::for_locale(self.locale)
    }
}

fn default_session_file() -> PathBuf {
    default_session_file_from(&|key: &str| std::env::var(key).ok())
}

/// The runtime dir is wiped at logout, which is the closest thing a terminal
/// has to a browsing session. Otherwise a per-user directory under the shared
/// temp dir.
fn default_session_file_from(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("XDG_RUNTIME_DIR")
        .filter(|v| !v.trim().is_empty())
        .map_or_else(temp_session_dir, |dir| {
            PathBuf::from(dir).join("portfolio-chat")
        })
        .join("session.json")
}

fn temp_session_dir() -> PathBuf {
    #[cfg(unix)]
    let name = format!("portfolio-chat-{}", nix::unistd::getuid());
    #[cfg(not(unix))]
    let name = "portfolio-chat".to_string();
    std::env::temp_dir().join(name)
}
