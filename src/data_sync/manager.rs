use crate::data_sync::config::{FeedConfig, TransportPolicy};
use crate::data_sync::normalize::normalize_payload;
use crate::data_sync::polling::HttpSnapshotSource;
use crate::data_sync::transport::{SnapshotSource, Transport, TransportEvent};
use crate::data_sync::websocket::WebSocketTransport;
use crate::error::FeedError;
use crate::state::{ViewStateStore, ViewUpdate};
use crate::types::MarketSnapshot;
use crate::utils::constants::EVENT_CHANNEL_CAPACITY;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Lifecycle notification emitted next to store updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { reason: String },
    /// A snapshot was applied; ranking lengths
    Snapshot {
        gainers: usize,
        losers: usize,
        top24h: usize,
        banner: usize,
    },
}

impl ConnectionEvent {
    fn snapshot_counts(snapshot: &MarketSnapshot) -> Self {
        Self::Snapshot {
            gainers: snapshot.gainers.len(),
            losers: snapshot.losers.len(),
            top24h: snapshot.top24h.len(),
            banner: snapshot.banner.len(),
        }
    }
}

/// Admits poll results in issue order; anything older than the last applied
/// result is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceGate {
    last_applied: u64,
}

impl SequenceGate {
    pub fn admit(&mut self, seq: u64) -> bool {
        if seq <= self.last_applied {
            return false;
        }
        self.last_applied = seq;
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }
}

/// What the feed task needs to publish updates
#[derive(Clone)]
struct FeedSink {
    store: Arc<ViewStateStore>,
    events_tx: broadcast::Sender<ConnectionEvent>,
    live: Arc<AtomicBool>,
}

impl FeedSink {
    fn apply_snapshot(&self, snapshot: MarketSnapshot) {
        let event = ConnectionEvent::snapshot_counts(&snapshot);
        self.publish(
            ViewUpdate::snapshot(snapshot).connected(true).stamped_now(),
            None,
            Some(event),
        );
    }

    /// Stamps the view with the new connection flag; rankings are kept
    fn set_connected(&self, is_connected: bool, reason: Option<String>) {
        self.publish(ViewUpdate::connection(is_connected).stamped_now(), reason, None);
    }

    fn apply_payload(&self, payload: &Value) -> Result<(), FeedError> {
        let normalized = normalize_payload(payload)?;
        if !normalized.is_complete() {
            debug!("Snapshot defaulted fields: {:?}", normalized.defaulted);
        }
        self.apply_snapshot(normalized.snapshot);
        Ok(())
    }

    fn publish(&self, update: ViewUpdate, reason: Option<String>, extra: Option<ConnectionEvent>) {
        let was_connected = self.store.current().is_connected;
        // checked under the publish lock so teardown can wait out an update in progress
        let Some(next) = self.store.replace_if(update, || self.live.load(Ordering::Acquire)) else {
            debug!("Feed torn down, dropping view update");
            return;
        };

        // send errors only mean nobody is listening
        if next.is_connected != was_connected {
            let event = if next.is_connected {
                info!("Feed connected");
                ConnectionEvent::Connected
            } else {
                let reason = reason.unwrap_or_else(|| "unknown".to_string());
                warn!("Feed disconnected: {}", reason);
                ConnectionEvent::Disconnected { reason }
            };
            let _ = self.events_tx.send(event);
        }
        if let Some(event) = extra {
            let _ = self.events_tx.send(event);
        }
    }
}

/// Owns exactly one logical feed connection and feeds a [`ViewStateStore`].
///
/// Construct one per session and call [`stop`](Self::stop) on teardown.
/// After `stop` returns (or the manager is dropped) the store receives no
/// further updates.
pub struct ConnectionManager {
    config: FeedConfig,
    store: Arc<ViewStateStore>,
    transport: Option<Box<dyn Transport>>,
    source: Option<Arc<dyn SnapshotSource>>,
    events_tx: broadcast::Sender<ConnectionEvent>,
    live: Arc<AtomicBool>,

    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl ConnectionManager {
    /// Fails with a fatal configuration error on an unusable config
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        Self::with_store(config, Arc::new(ViewStateStore::new()))
    }

    pub fn with_store(config: FeedConfig, store: Arc<ViewStateStore>) -> Result<Self, FeedError> {
        if let Err(e) = config.validate() {
            error!("Refusing to create connection manager: {}", e);
            return Err(e);
        }

        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            store,
            transport: None,
            source: None,
            events_tx,
            live: Arc::new(AtomicBool::new(false)),
            task: None,
            shutdown_tx: None,
        })
    }

    /// Replaces the default WebSocket transport; consumed by the next push start
    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = Some(transport);
    }

    /// Replaces the default HTTP source used by the polling policy
    pub fn set_snapshot_source(&mut self, source: Arc<dyn SnapshotSource>) {
        self.source = Some(source);
    }

    pub async fn start(&mut self) -> Result<(), FeedError> {
        if self.task.is_some() {
            return Err(FeedError::AlreadyStarted);
        }
        info!("Starting connection manager ({} policy, {})", self.config.policy, self.config.feed_url);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let sink = FeedSink {
            store: Arc::clone(&self.store),
            events_tx: self.events_tx.clone(),
            live: Arc::clone(&self.live),
        };

        let task = match self.config.policy {
            TransportPolicy::Poll => {
                let source = match &self.source {
                    Some(source) => Arc::clone(source),
                    None => Arc::new(HttpSnapshotSource::from_config(&self.config)?) as Arc<dyn SnapshotSource>,
                };
                let period = self.config.poll_interval();
                self.live.store(true, Ordering::Release);
                tokio::spawn(run_polling(sink, source, period, shutdown_rx))
            }
            TransportPolicy::Push => {
                let transport = self
                    .transport
                    .take()
                    .unwrap_or_else(|| Box::new(WebSocketTransport::from_config(&self.config)) as Box<dyn Transport>);
                self.live.store(true, Ordering::Release);
                tokio::spawn(run_push(sink, transport, shutdown_rx))
            }
        };

        self.task = Some(task);
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    /// Stops the feed task and waits for it to release the transport
    pub async fn stop(&mut self) {
        info!("Stopping connection manager");
        self.live.store(false, Ordering::Release);

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Feed task error during shutdown: {}", e);
            }
        }

        info!("Connection manager stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn store(&self) -> Arc<ViewStateStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events_tx.subscribe()
    }
}

/// Dropping a running manager aborts the feed task and blocks until any update
/// already being published has finished, so the store is quiet once `drop`
/// returns. Do not drop the manager from inside a store listener.
impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                warn!("ConnectionManager dropped while running, aborting feed task");
            }
            task.abort();
            self.store.quiesce();
        }
    }
}

type PollOutcome = (u64, Result<Value, FeedError>);

async fn run_polling(
    sink: FeedSink,
    source: Arc<dyn SnapshotSource>,
    period: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    info!("Polling task started, interval {:?}", period);

    // first tick completes immediately
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight: JoinSet<PollOutcome> = JoinSet::new();
    let mut gate = SequenceGate::default();
    let mut issued = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                let (seq, result) = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        if !e.is_cancelled() {
                            error!("Poll request task failed: {}", e);
                        }
                        continue;
                    }
                };

                if !gate.admit(seq) {
                    debug!("Discarding stale poll #{} (last applied #{})", seq, gate.last_applied());
                    continue;
                }

                let applied = result.and_then(|payload| sink.apply_payload(&payload));
                if let Err(e) = applied {
                    warn!("Poll #{} failed: {}", seq, e);
                    sink.set_connected(false, Some(e.to_string()));
                }
            }
            _ = ticker.tick() => {
                issued += 1;
                let seq = issued;
                let source = Arc::clone(&source);
                debug!("Issuing poll #{}", seq);
                in_flight.spawn(async move { (seq, source.fetch().await) });
            }
        }
    }

    in_flight.abort_all();
    info!("Polling task ended after {} requests", issued);
}

async fn run_push(sink: FeedSink, mut transport: Box<dyn Transport>, mut shutdown_rx: mpsc::Receiver<()>) {
    info!("Push task started");

    let connected = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => None,
        result = transport.connect() => Some(result),
    };
    match connected {
        Some(Ok(())) => sink.set_connected(true, None),
        Some(Err(e)) => {
            warn!("Initial push connection failed: {}", e);
            sink.set_connected(false, Some(e.to_string()));
        }
        None => {
            transport.close().await;
            info!("Push task ended before connecting");
            return;
        }
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            event = transport.next_event() => match event {
                Some(TransportEvent::Opened) => sink.set_connected(true, None),
                Some(TransportEvent::Message(payload)) => {
                    if let Err(e) = sink.apply_payload(&payload) {
                        warn!("Skipping push message: {}", e);
                        // a message still proves the link is up
                        sink.set_connected(true, None);
                    }
                }
                Some(TransportEvent::Closed { reason }) => sink.set_connected(false, Some(reason)),
                None => {
                    error!("Push transport gave up");
                    sink.set_connected(false, Some("transport gave up reconnecting".to_string()));
                    break;
                }
            },
        }
    }

    transport.close().await;
    info!("Push task ended");
}

/// Builder for [`ConnectionManager`]
#[derive(Default)]
pub struct ConnectionManagerBuilder {
    config: Option<FeedConfig>,
    store: Option<Arc<ViewStateStore>>,
    transport: Option<Box<dyn Transport>>,
    source: Option<Arc<dyn SnapshotSource>>,
}

impl ConnectionManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: FeedConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_store(mut self, store: Arc<ViewStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_snapshot_source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Falls back to [`FeedConfig::from_env`] when no config was given
    pub fn build(self) -> Result<ConnectionManager, FeedError> {
        let config = match self.config {
            Some(config) => config,
            None => FeedConfig::from_env().map_err(|e| FeedError::Configuration(e.to_string()))?,
        };
        let store = self.store.unwrap_or_default();

        let mut manager = ConnectionManager::with_store(config, store)?;
        if let Some(transport) = self.transport {
            manager.set_transport(transport);
        }
        if let Some(source) = self.source {
            manager.set_snapshot_source(source);
        }
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ViewState;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::sleep;

    const POLL_URL: &str = "http://127.0.0.1:5001/data";
    const PUSH_URL: &str = "ws://127.0.0.1:5001";

    fn payload(symbol: &str) -> Value {
        json!({
            "gainers": [{"symbol": symbol, "current": 1.5, "gain": 3.2}],
            "losers": [{"product_id": "ADA-USD", "current": 0.4, "percent_change": -1.1}],
            "top24h": [],
            "banner": []
        })
    }

    /// Replies from a script of (delay, result); fails once exhausted
    struct ScriptedSource {
        script: Mutex<VecDeque<(Duration, Result<Value, FeedError>)>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<(u64, Result<Value, FeedError>)>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(secs, result)| (Duration::from_secs(secs), result))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch(&self) -> Result<Value, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some((delay, result)) => {
                    sleep(delay).await;
                    result
                }
                None => Err(FeedError::Transport("script exhausted".to_string())),
            }
        }
    }

    /// Always answers with the same payload after `delay`
    struct SteadySource {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for SteadySource {
        async fn fetch(&self) -> Result<Value, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            Ok(payload("BTC-USD"))
        }
    }

    /// Transport driven by the test through a channel
    struct ScriptedTransport {
        connect_result: Option<Result<(), FeedError>>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&mut self) -> Result<(), FeedError> {
            self.connect_result.take().unwrap_or(Ok(()))
        }

        async fn next_event(&mut self) -> Option<TransportEvent> {
            self.events.recv().await
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn scripted_transport(
        connect_result: Result<(), FeedError>,
    ) -> (Box<dyn Transport>, mpsc::UnboundedSender<TransportEvent>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = ScriptedTransport {
            connect_result: Some(connect_result),
            events: rx,
            closed: Arc::clone(&closed),
        };
        (Box::new(transport), tx, closed)
    }

    /// Lets every runnable task finish; paused time only advances when idle
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    fn polling_manager(source: Arc<dyn SnapshotSource>) -> ConnectionManager {
        ConnectionManagerBuilder::new()
            .with_config(FeedConfig::polling(POLL_URL))
            .with_snapshot_source(source)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sequence_gate() {
        let mut gate = SequenceGate::default();
        assert!(gate.admit(1));
        assert!(gate.admit(3));
        assert!(!gate.admit(2));
        assert!(!gate.admit(3));
        assert!(gate.admit(4));
        assert_eq!(gate.last_applied(), 4);
    }

    #[test]
    fn test_missing_endpoint_is_fatal() {
        let err = ConnectionManager::new(FeedConfig::polling("")).err().unwrap();
        assert!(err.is_fatal());

        let err = ConnectionManagerBuilder::new()
            .with_config(FeedConfig::push("http://127.0.0.1:5001"))
            .build()
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_rankings() {
        let source = ScriptedSource::new(vec![
            (0, Ok(payload("BTC-USD"))),
            (0, Err(FeedError::HttpStatus(503))),
        ]);
        let mut manager = polling_manager(source.clone());
        let store = manager.store();

        manager.start().await.unwrap();
        settle().await;
        let first = store.current();
        assert!(first.is_connected);
        assert_eq!(first.gainers[0].symbol, "BTC-USD");
        assert_eq!(first.losers[0].symbol, "ADA-USD");

        sleep(Duration::from_secs(10)).await;
        let second = store.current();
        assert!(!second.is_connected);
        assert_eq!(second.gainers, first.gainers);
        assert_eq!(second.losers, first.losers);
        assert!(second.last_update >= first.last_update);
        assert_eq!(store.version(), 2);

        manager.stop().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_poll_body_marks_disconnected() {
        let source = ScriptedSource::new(vec![(0, Ok(payload("ETH-USD"))), (0, Ok(json!("oops")))]);
        let mut manager = polling_manager(source);
        let store = manager.store();

        manager.start().await.unwrap();
        sleep(Duration::from_secs(11)).await;

        let state = store.current();
        assert!(!state.is_connected);
        assert_eq!(state.gainers[0].symbol, "ETH-USD");
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_is_discarded() {
        // poll #1 answers at t=25, poll #2 at t=11, poll #3 at t=120
        let source = ScriptedSource::new(vec![
            (25, Ok(payload("OLD-USD"))),
            (1, Ok(payload("NEW-USD"))),
            (100, Err(FeedError::Timeout(Duration::from_secs(10)))),
        ]);
        let mut manager = polling_manager(source);
        let store = manager.store();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let s = Arc::clone(&seen);
        store.subscribe(move |state: &Arc<ViewState>| {
            if let Some(asset) = state.gainers.first() {
                s.lock().unwrap().push(asset.symbol.clone());
            }
        });

        manager.start().await.unwrap();
        sleep(Duration::from_secs(28)).await;

        let state = store.current();
        assert!(state.is_connected);
        assert_eq!(state.gainers[0].symbol, "NEW-USD");
        assert_eq!(store.version(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["NEW-USD".to_string()]);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_stop() {
        let source = Arc::new(SteadySource {
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        });
        let mut manager = polling_manager(source.clone());
        let store = manager.store();

        manager.start().await.unwrap();
        assert!(manager.is_running());
        // poll #3 issued at t=20 is still in flight
        sleep(Duration::from_secs(22)).await;
        manager.stop().await;
        assert!(!manager.is_running());

        let version = store.version();
        let calls = source.calls.load(Ordering::SeqCst);
        assert_eq!(version, 2);
        assert_eq!(calls, 3);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(store.version(), version);
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_drop() {
        let source = Arc::new(SteadySource {
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        });
        let mut manager = polling_manager(source.clone());
        let store = manager.store();

        manager.start().await.unwrap();
        sleep(Duration::from_secs(12)).await;
        drop(manager);

        let version = store.version();
        sleep(Duration::from_secs(60)).await;
        assert_eq!(version, 1);
        assert_eq!(store.version(), version);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_subscriber_keeps_schedule_alive() {
        let source = Arc::new(SteadySource {
            delay: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
        });
        let mut manager = polling_manager(source.clone());
        let store = manager.store();

        let healthy = Arc::new(AtomicUsize::new(0));
        store.subscribe(|_| panic!("subscriber bug"));
        let h = Arc::clone(&healthy);
        store.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        manager.start().await.unwrap();
        sleep(Duration::from_secs(35)).await;

        // polls at t=0, 10, 20, 30
        assert!(manager.is_running());
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert_eq!(healthy.load(Ordering::SeqCst), 4);
        assert_eq!(store.version(), 4);
        manager.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_waits_for_update_in_progress() {
        let source = Arc::new(SteadySource {
            delay: Duration::from_millis(1),
            calls: AtomicUsize::new(0),
        });
        let config = FeedConfig {
            poll_interval_secs: 1,
            ..FeedConfig::polling(POLL_URL)
        };
        let mut manager = ConnectionManagerBuilder::new()
            .with_config(config)
            .with_snapshot_source(source)
            .build()
            .unwrap();
        let store = manager.store();

        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        store.subscribe(move |_| {
            let _ = entered_tx.send(());
            std::thread::sleep(Duration::from_millis(200));
        });

        manager.start().await.unwrap();
        // a listener is now running on a worker thread
        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap()).await.unwrap();
        drop(manager);

        let version = store.version();
        assert_eq!(version, 1);
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.version(), version);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let mut manager = polling_manager(ScriptedSource::new(vec![]));
        manager.start().await.unwrap();
        assert!(matches!(manager.start().await, Err(FeedError::AlreadyStarted)));
        manager.stop().await;

        // a stopped manager may be started again
        manager.start().await.unwrap();
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_lifecycle() {
        let (transport, tx, closed) = scripted_transport(Ok(()));
        let mut manager = ConnectionManagerBuilder::new()
            .with_config(FeedConfig::push(PUSH_URL))
            .with_transport(transport)
            .build()
            .unwrap();
        let store = manager.store();
        let mut events = manager.subscribe_events();

        manager.start().await.unwrap();
        settle().await;
        assert!(store.current().is_connected);
        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);

        tx.send(TransportEvent::Message(payload("SOL-USD"))).unwrap();
        settle().await;
        assert_eq!(store.current().gainers[0].symbol, "SOL-USD");
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectionEvent::Snapshot {
                gainers: 1,
                losers: 1,
                top24h: 0,
                banner: 0
            }
        );

        tx.send(TransportEvent::Closed {
            reason: "closed by server".to_string(),
        })
        .unwrap();
        settle().await;
        let state = store.current();
        assert!(!state.is_connected);
        assert_eq!(state.gainers[0].symbol, "SOL-USD");
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectionEvent::Disconnected {
                reason: "closed by server".to_string()
            }
        );

        // a message implies connectivity even before the reopen is reported
        tx.send(TransportEvent::Message(payload("XRP-USD"))).unwrap();
        settle().await;
        assert!(store.current().is_connected);
        assert_eq!(store.current().gainers[0].symbol, "XRP-USD");

        manager.stop().await;
        assert!(closed.load(Ordering::SeqCst));

        let version = store.version();
        let _ = tx.send(TransportEvent::Message(payload("DOGE-USD")));
        sleep(Duration::from_secs(5)).await;
        assert_eq!(store.version(), version);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_initial_failure_then_reopen() {
        let (transport, tx, _closed) = scripted_transport(Err(FeedError::Transport("refused".to_string())));
        let mut manager = ConnectionManagerBuilder::new()
            .with_config(FeedConfig::push(PUSH_URL))
            .with_transport(transport)
            .build()
            .unwrap();
        let store = manager.store();

        manager.start().await.unwrap();
        settle().await;
        assert!(!store.current().is_connected);
        assert_eq!(store.version(), 1);

        tx.send(TransportEvent::Opened).unwrap();
        settle().await;
        assert!(store.current().is_connected);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_push_message_is_skipped() {
        let (transport, tx, _closed) = scripted_transport(Ok(()));
        let mut manager = ConnectionManagerBuilder::new()
            .with_config(FeedConfig::push(PUSH_URL))
            .with_transport(transport)
            .build()
            .unwrap();
        let store = manager.store();

        manager.start().await.unwrap();
        tx.send(TransportEvent::Message(payload("BTC-USD"))).unwrap();
        tx.send(TransportEvent::Message(json!([1, 2, 3]))).unwrap();
        settle().await;

        let state = store.current();
        assert!(state.is_connected);
        assert_eq!(state.gainers[0].symbol, "BTC-USD");
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_transport_giving_up_ends_task() {
        let (transport, tx, closed) = scripted_transport(Ok(()));
        let mut manager = ConnectionManagerBuilder::new()
            .with_config(FeedConfig::push(PUSH_URL))
            .with_transport(transport)
            .build()
            .unwrap();
        let store = manager.store();

        manager.start().await.unwrap();
        settle().await;
        drop(tx);
        settle().await;

        assert!(!store.current().is_connected);
        assert!(!manager.is_running());
        assert!(closed.load(Ordering::SeqCst));
        manager.stop().await;
    }
}
