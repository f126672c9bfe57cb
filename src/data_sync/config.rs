use crate::error::FeedError;
use crate::utils::config_loader::load_from_file_sync;
use crate::utils::constants::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use url::Url;

/// How the feed is reached. Mutually exclusive per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportPolicy {
    /// GET a full snapshot on a fixed interval
    #[default]
    Poll,
    /// Persistent WebSocket connection with server-initiated snapshots
    Push,
}

/// Configuration for the live-update synchronization layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Snapshot endpoint (http/https for polling, ws/wss for push)
    pub feed_url: String,
    pub policy: TransportPolicy,
    /// Seconds between polls
    pub poll_interval_secs: u64,
    /// Rows per table in the display projection
    pub display_limit: usize,
    /// Timeout for a single poll request in seconds
    pub http_timeout_secs: u64,
    /// WebSocket connection timeout in seconds
    pub ws_connection_timeout_secs: u64,
    /// Consecutive failed reconnects before the push transport gives up
    pub max_reconnect_attempts: u32,
    /// First reconnect delay in milliseconds, doubled per attempt
    pub reconnect_delay_ms: u64,
    /// Upper bound of the reconnect delay in seconds
    pub max_reconnect_delay_secs: u64,
    /// Socket.IO event carrying snapshots
    pub push_event: String,
    /// Base of the external per-asset reference link
    pub external_link_base: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            policy: TransportPolicy::Poll,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            ws_connection_timeout_secs: DEFAULT_WS_CONNECTION_TIMEOUT_SECS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_delay_secs: DEFAULT_MAX_RECONNECT_DELAY_SECS,
            push_event: DEFAULT_PUSH_EVENT.to_string(),
            external_link_base: DEFAULT_EXTERNAL_LINK_BASE.to_string(),
        }
    }
}

impl FeedConfig {
    pub fn polling(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            policy: TransportPolicy::Poll,
            ..Self::default()
        }
    }

    pub fn push(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            policy: TransportPolicy::Push,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> eyre::Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(feed_url) = std::env::var("FEED_URL") {
            let _url = Url::parse(&feed_url)
                .map_err(|e| eyre::eyre!("Invalid FEED_URL: {}", e))?;
            config.feed_url = feed_url;
        }

        if let Ok(policy) = std::env::var("FEED_TRANSPORT") {
            config.policy = policy.parse()
                .map_err(|e| eyre::eyre!("Invalid FEED_TRANSPORT '{}': {}", policy, e))?;
        }

        if let Ok(interval_str) = std::env::var("POLL_INTERVAL_SECS") {
            config.poll_interval_secs = interval_str.parse()
                .map_err(|e| eyre::eyre!("Invalid POLL_INTERVAL_SECS: {}", e))?;
        }

        if let Ok(limit_str) = std::env::var("DISPLAY_LIMIT") {
            config.display_limit = limit_str.parse()
                .map_err(|e| eyre::eyre!("Invalid DISPLAY_LIMIT: {}", e))?;
        }

        if let Ok(timeout_str) = std::env::var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = timeout_str.parse()
                .map_err(|e| eyre::eyre!("Invalid HTTP_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(timeout_str) = std::env::var("WS_CONNECTION_TIMEOUT_SECS") {
            config.ws_connection_timeout_secs = timeout_str.parse()
                .map_err(|e| eyre::eyre!("Invalid WS_CONNECTION_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(max_attempts_str) = std::env::var("MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = max_attempts_str.parse()
                .map_err(|e| eyre::eyre!("Invalid MAX_RECONNECT_ATTEMPTS: {}", e))?;
        }

        if let Ok(delay_str) = std::env::var("RECONNECT_DELAY_MS") {
            config.reconnect_delay_ms = delay_str.parse()
                .map_err(|e| eyre::eyre!("Invalid RECONNECT_DELAY_MS: {}", e))?;
        }

        if let Ok(delay_str) = std::env::var("MAX_RECONNECT_DELAY_SECS") {
            config.max_reconnect_delay_secs = delay_str.parse()
                .map_err(|e| eyre::eyre!("Invalid MAX_RECONNECT_DELAY_SECS: {}", e))?;
        }

        if let Ok(event) = std::env::var("PUSH_EVENT_NAME") {
            config.push_event = event;
        }

        if let Ok(link_base) = std::env::var("EXTERNAL_LINK_BASE") {
            config.external_link_base = link_base;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file; `${VAR}` references are expanded
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        Ok(load_from_file_sync(path)?)
    }

    /// Rejects configurations the manager must refuse to start with
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.feed_url.trim().is_empty() {
            return Err(FeedError::Configuration("no feed endpoint configured".to_string()));
        }

        let url = Url::parse(&self.feed_url)
            .map_err(|e| FeedError::Configuration(format!("invalid feed_url '{}': {}", self.feed_url, e)))?;

        let allowed: &[&str] = match self.policy {
            TransportPolicy::Poll => &["http", "https"],
            TransportPolicy::Push => &["ws", "wss"],
        };
        if !allowed.contains(&url.scheme()) {
            return Err(FeedError::Configuration(format!(
                "{} transport cannot use a '{}' endpoint",
                self.policy,
                url.scheme()
            )));
        }

        if self.policy == TransportPolicy::Poll && self.poll_interval_secs == 0 {
            return Err(FeedError::Configuration("poll_interval_secs must be positive".to_string()));
        }
        if self.policy == TransportPolicy::Push && self.max_reconnect_attempts == 0 {
            return Err(FeedError::Configuration("max_reconnect_attempts must be positive".to_string()));
        }
        if self.display_limit == 0 {
            return Err(FeedError::Configuration("display_limit must be positive".to_string()));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn ws_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_connection_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.max_reconnect_delay_secs)
    }
}
