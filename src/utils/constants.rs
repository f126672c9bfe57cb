/// Default cadence of the polling transport
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Rows shown per ranking table by the display projection
pub const DEFAULT_DISPLAY_LIMIT: usize = 13;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WS_CONNECTION_TIMEOUT_SECS: u64 = 10;

// Push transport reconnect ceiling and backoff
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RECONNECT_DELAY_SECS: u64 = 30;

/// Socket.IO event name carrying snapshots
pub const DEFAULT_PUSH_EVENT: &str = "crypto_update";

pub const DEFAULT_EXTERNAL_LINK_BASE: &str = "https://www.coinbase.com/price";

/// Quote-currency suffix stripped when deriving external links
pub const QUOTE_SUFFIX: &str = "-USD";

/// Buffer of the lifecycle event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
