use thiserror::Error;

/// Failures while talking to a station data source.
///
/// These never cross the adapter boundary into aggregation results; each
/// adapter maps them to its degraded-mode continuation and logs a warning.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0} from source")]
    Status(u16),

    #[error("source did not respond in time")]
    Timeout,

    #[error("failed to decode source payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SourceError {
    /// Whether the failure is likely transient and worth one retry
    /// before degrading.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::Timeout => true,
            SourceError::Status(code) => *code >= 500,
            SourceError::Decode(_) => false,
        }
    }
}

/// Failures in the client-local notification store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures on the realtime channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("outbound queue is full")]
    QueueFull,

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid channel url: {0}")]
    InvalidUrl(String),
}
