// Layered layout
pub mod data_sync; // Sync layer: transports, normalization, connection lifecycle
pub mod state; // View layer: immutable view state, store, display projection

// Shared types and utilities
pub mod error;
pub mod types;
pub mod utils;

pub use data_sync::{
    ConnectionEvent, ConnectionManager, ConnectionManagerBuilder, FeedConfig, SnapshotSource, Transport,
    TransportEvent, TransportPolicy,
};
pub use error::{ErrorCategory, FeedError};
pub use state::{DashboardView, DisplayRow, StatusBadge, SubscriptionId, ViewState, ViewStateStore, ViewUpdate};
pub use types::{MarketSnapshot, RankedAsset, RankingKind};
pub use utils::{derive_external_symbol, format_currency, format_decimal};
