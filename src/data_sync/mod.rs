/// Data Synchronization Layer
///
/// Keeps one logical connection to the market movers feed and turns whatever
/// arrives into complete [`ViewState`](crate::state::ViewState) replacements:
///
/// - HTTP polling of a snapshot endpoint on a fixed interval
/// - WebSocket push with Socket.IO framing and bounded reconnect backoff
/// - A single alias table normalizing feed payloads into ranked assets
/// - Ordered application with stale poll responses discarded

pub mod config;
pub mod manager;
pub mod normalize;
pub mod polling;
pub mod transport;
pub mod websocket;


pub use config::{FeedConfig, TransportPolicy};
pub use manager::{ConnectionEvent, ConnectionManager, ConnectionManagerBuilder, SequenceGate};
pub use normalize::{normalize_asset, normalize_payload, parse_payload, AliasTable, NormalizedSnapshot, ASSET_ALIASES};
pub use polling::HttpSnapshotSource;
pub use transport::{SnapshotSource, Transport, TransportEvent};
pub use websocket::{decode_frame, PushFrame, ReconnectPolicy, WebSocketTransport};
