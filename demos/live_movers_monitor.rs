/// Live Market Movers Monitor
///
/// Headless console adapter: connects to the feed configured in the
/// environment (see `FeedConfig::from_env`), or in the TOML file named by
/// `FEED_CONFIG_FILE`, and logs the status badge and the top rows of every
/// ranking on each update. Stop with Ctrl-C.
use eyre::Result;
use market_movers::data_sync::{ConnectionEvent, ConnectionManagerBuilder, FeedConfig};
use market_movers::state::{DashboardView, RankingTable};
use market_movers::utils::load_from_file;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ROWS_LOGGED: usize = 3;

fn log_table(table: &RankingTable) {
    info!("  {} ({} of {})", table.kind, table.rows.len(), table.total);
    for row in table.rows.iter().take(ROWS_LOGGED) {
        info!(
            "    #{:<2} {:<12} {:>14} {:>10}  {}",
            row.rank, row.symbol, row.price, row.change, row.external_url
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: no .env file loaded: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config: FeedConfig = match std::env::var("FEED_CONFIG_FILE") {
        Ok(path) => {
            info!("Loading feed config from {}", path);
            load_from_file(&path).await?
        }
        Err(_) => FeedConfig::from_env()?,
    };
    info!("Feed: {} ({} policy)", config.feed_url, config.policy);

    let mut manager = ConnectionManagerBuilder::new().with_config(config.clone()).build()?;
    let store = manager.store();

    store.subscribe(move |state| {
        let view = DashboardView::from_state(state, &config);
        let stale = if view.is_stale { " (stale)" } else { "" };
        info!("[{}] last update {}{}", view.badge.label, view.badge.last_update, stale);
        for table in [&view.gainers, &view.losers, &view.top24h, &view.banner] {
            log_table(table);
        }
    });

    let mut events = manager.subscribe_events();
    manager.start().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ConnectionEvent::Disconnected { reason }) => warn!("Offline: {}", reason),
                Ok(event) => info!("Event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} connection events", skipped),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    manager.stop().await;
    Ok(())
}
