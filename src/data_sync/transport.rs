use crate::error::FeedError;
use async_trait::async_trait;
use serde_json::Value;

/// Event surfaced by a push transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A (re)connection was established
    Opened,
    /// A snapshot payload arrived
    Message(Value),
    /// The connection dropped; the transport may reconnect on the next poll
    Closed { reason: String },
}

/// Persistent duplex connection to the feed.
///
/// Reconnection and backoff belong to the implementation: after reporting
/// [`TransportEvent::Closed`], the next `next_event` call is expected to
/// reconnect on its own schedule. Returning `None` means the transport has
/// given up for good.
#[async_trait]
pub trait Transport: Send {
    /// Establish the initial connection
    async fn connect(&mut self) -> Result<(), FeedError>;

    /// Wait for the next event. Must be cancel safe.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Release the connection. Idempotent.
    async fn close(&mut self);
}

/// Request/response source of full snapshots, used by the polling policy
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, FeedError>;
}
