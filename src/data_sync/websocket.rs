use crate::data_sync::config::FeedConfig;
use crate::data_sync::transport::{Transport, TransportEvent};
use crate::error::FeedError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bounded exponential backoff for the push transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed dials before giving up
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_delay: config.reconnect_delay(),
            max_delay: config.max_reconnect_delay(),
        }
    }

    /// Delay before the dial following `failed_attempts` failures
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let factor = 1u32 << failed_attempts.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// One decoded text frame
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    Snapshot(Value),
    /// Engine.IO open packet, answered with a namespace connect
    Open,
    /// Engine.IO ping, answered with a pong
    Ping,
    /// Engine.IO close packet
    Close,
    Ignored,
    Malformed(String),
}

/// Decodes plain JSON object frames and Engine.IO v4 / Socket.IO frames.
/// Only events named `event_name` carry snapshots.
pub fn decode_frame(text: &str, event_name: &str) -> PushFrame {
    let text = text.trim();

    if text.starts_with('{') {
        return match serde_json::from_str::<Value>(text) {
            Ok(value) => PushFrame::Snapshot(value),
            Err(e) => PushFrame::Malformed(format!("invalid JSON frame: {e}")),
        };
    }

    match text.as_bytes().first() {
        Some(b'0') => PushFrame::Open,
        Some(b'1') => PushFrame::Close,
        Some(b'2') => PushFrame::Ping,
        Some(b'4') => decode_socketio_packet(&text[1..], event_name),
        _ => PushFrame::Ignored,
    }
}

fn decode_socketio_packet(packet: &str, event_name: &str) -> PushFrame {
    // Only EVENT packets ("2"), optionally namespaced or with an ack id
    if !packet.starts_with('2') {
        return PushFrame::Ignored;
    }
    let Some(start) = packet.find('[') else {
        return PushFrame::Malformed("event packet without arguments".to_string());
    };

    let args: Vec<Value> = match serde_json::from_str(&packet[start..]) {
        Ok(args) => args,
        Err(e) => return PushFrame::Malformed(format!("invalid event arguments: {e}")),
    };

    match args.as_slice() {
        [Value::String(name), payload, ..] if name == event_name => PushFrame::Snapshot(payload.clone()),
        [Value::String(name), ..] => {
            debug!("Ignoring Socket.IO event '{}'", name);
            PushFrame::Ignored
        }
        _ => PushFrame::Malformed("event packet without a name".to_string()),
    }
}

/// WebSocket push transport that owns its reconnection schedule
pub struct WebSocketTransport {
    url: String,
    connection_timeout: Duration,
    reconnect: ReconnectPolicy,
    push_event: String,
    stream: Option<WsStream>,
    failed_attempts: u32,
    closed: bool,
}

impl WebSocketTransport {
    pub fn new(
        url: String,
        connection_timeout: Duration,
        reconnect: ReconnectPolicy,
        push_event: String,
    ) -> Self {
        Self {
            url,
            connection_timeout,
            reconnect,
            push_event,
            stream: None,
            failed_attempts: 0,
            closed: false,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            config.feed_url.clone(),
            config.ws_connection_timeout(),
            ReconnectPolicy::from_config(config),
            config.push_event.clone(),
        )
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn dial(&self) -> Result<WsStream, FeedError> {
        let url = Url::parse(&self.url)
            .map_err(|e| FeedError::Configuration(format!("invalid WebSocket URL: {e}")))?;
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = timeout(self.connection_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| FeedError::Timeout(self.connection_timeout))??;

        Ok(ws_stream)
    }

    async fn reconnect(&mut self) -> Option<TransportEvent> {
        while self.failed_attempts < self.reconnect.max_attempts {
            let delay = self.reconnect.delay_for(self.failed_attempts);
            warn!("Attempting reconnection #{} in {:?}", self.failed_attempts + 1, delay);
            sleep(delay).await;

            match self.dial().await {
                Ok(ws_stream) => {
                    info!("WebSocket reconnected after {} failed attempts", self.failed_attempts);
                    self.stream = Some(ws_stream);
                    self.failed_attempts = 0;
                    return Some(TransportEvent::Opened);
                }
                Err(e) => {
                    self.failed_attempts += 1;
                    error!("WebSocket reconnection failed: {}", e);
                }
            }
        }

        error!("Max reconnection attempts reached, giving up");
        None
    }

    fn drop_connection(&mut self, reason: impl Into<String>) -> TransportEvent {
        let reason = reason.into();
        info!("WebSocket connection lost: {}", reason);
        self.stream = None;
        TransportEvent::Closed { reason }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), FeedError> {
        self.closed = false;
        match self.dial().await {
            Ok(ws_stream) => {
                info!("WebSocket connected");
                self.stream = Some(ws_stream);
                self.failed_attempts = 0;
                Ok(())
            }
            Err(e) => {
                // the failed initial dial counts toward the ceiling
                self.failed_attempts = 1;
                Err(e)
            }
        }
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            if self.closed {
                return None;
            }
            let Some(ws) = self.stream.as_mut() else {
                return self.reconnect().await;
            };

            match ws.next().await {
                Some(Ok(Message::Text(text))) => match decode_frame(text.as_str(), &self.push_event) {
                    PushFrame::Snapshot(payload) => return Some(TransportEvent::Message(payload)),
                    PushFrame::Open => {
                        debug!("Engine.IO open received, joining default namespace");
                        if let Err(e) = ws.send(Message::Text("40".to_string().into())).await {
                            return Some(self.drop_connection(format!("namespace connect failed: {e}")));
                        }
                    }
                    PushFrame::Ping => {
                        if let Err(e) = ws.send(Message::Text("3".to_string().into())).await {
                            return Some(self.drop_connection(format!("Engine.IO pong failed: {e}")));
                        }
                    }
                    PushFrame::Close => return Some(self.drop_connection("Engine.IO close packet")),
                    PushFrame::Malformed(reason) => warn!("Dropping push frame: {}", reason),
                    PushFrame::Ignored => {}
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = ws.send(Message::Pong(data)).await {
                        return Some(self.drop_connection(format!("failed to send pong: {e}")));
                    }
                }
                Some(Ok(Message::Close(_))) => return Some(self.drop_connection("closed by server")),
                Some(Ok(_)) => {
                    // binary and pong frames carry no snapshots
                }
                Some(Err(e)) => return Some(self.drop_connection(format!("WebSocket error: {e}"))),
                None => return Some(self.drop_connection("stream ended")),
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        if let Some(mut ws_stream) = self.stream.take() {
            match timeout(self.connection_timeout, ws_stream.close(None)).await {
                Ok(Ok(())) => info!("WebSocket closed"),
                Ok(Err(e)) => debug!("WebSocket close handshake failed: {}", e),
                Err(_) => debug!("WebSocket close handshake timed out"),
            }
        }
    }
}
