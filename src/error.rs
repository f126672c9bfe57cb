use crate::utils::config_loader::LoadConfigError;
use std::time::Duration;

/// Coarse classification used by callers that only care about recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, timeout, protocol error. Recovered locally.
    Transport,
    /// Unexpected JSON shape. Recovered per field.
    MalformedPayload,
    /// The manager refuses to start.
    FatalConfiguration,
    /// Misuse of the manager lifecycle (e.g. starting twice).
    Lifecycle,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    // Transport
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed responded with HTTP status {0}")]
    HttpStatus(u16),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    // Payload
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    ConfigLoad(#[from] LoadConfigError),

    #[error("connection manager already started")]
    AlreadyStarted,
}

impl FeedError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_)
            | Self::Http(_)
            | Self::HttpStatus(_)
            | Self::WebSocket(_)
            | Self::Timeout(_) => ErrorCategory::Transport,
            Self::MalformedPayload(_) | Self::Json(_) => ErrorCategory::MalformedPayload,
            Self::Configuration(_) | Self::ConfigLoad(_) => ErrorCategory::FatalConfiguration,
            Self::AlreadyStarted => ErrorCategory::Lifecycle,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::FatalConfiguration
    }
}
