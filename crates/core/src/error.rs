use thiserror::Error;

/// Why a job-list fetch failed. Every variant aborts only the current cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connect, TLS or timeout failure.
    #[error("network error: {0}")]
    Network(String),
    /// Unexpected status code or unparseable body.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Server rejected the credentials (401/403).
    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },
}

impl FetchError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Protocol(_) => "protocol",
            FetchError::Auth { .. } => "auth",
        }
    }
}

/// Notification delivery failed. Logged, never fatal.
#[derive(Debug, Error)]
#[error("notification sink `{sink}` failed: {reason}")]
pub struct SinkError {
    /// Which sink failed (`log`, `webhook`, ...).
    pub sink: &'static str,
    /// What went wrong.
    pub reason: String,
}

impl SinkError {
    /// Builds an error for `sink`.
    pub fn new(sink: &'static str, reason: impl Into<String>) -> Self {
        Self {
            sink,
            reason: reason.into(),
        }
    }
}

/// History write failed. Logged, never fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the history file failed.
    #[error("history io: {0}")]
    Io(#[from] std::io::Error),
    /// A record could not be serialized.
    #[error("history encode: {0}")]
    Encode(#[from] serde_json::Error),
}
