//! Error types for Glance gateway

use thiserror::Error;

/// Result type alias for Glance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Glance gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Calendar feed could not be retrieved
    #[error("calendar fetch error: {0}")]
    Fetch(String),

    /// Calendar feed could not be parsed
    #[error("calendar parse error: {0}")]
    Parse(String),

    /// Language model endpoint failed
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Language model answered in an unusable shape
    #[error("format error: {0}")]
    Format(String),

    /// Host session transport error
    #[error("session error: {0}")]
    Session(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Websocket error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
    /// Short text shown on the wearer's display when a turn fails
    #[must_use]
    pub const fn fallback_message(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "Couldn't reach your calendar right now.",
            Self::Parse(_) => "Couldn't read your calendar.",
            Self::Upstream(_) => "The assistant is unavailable right now.",
            Self::Format(_) => "Sorry, I didn't get a usable answer.",
            _ => "Sorry, something went wrong.",
        }
    }
}
