//! Render-ready projection of a [`ViewState`].
//!
//! Truncation to the configured row count happens here and nowhere else; the
//! store always keeps the full ranking.

use crate::data_sync::config::FeedConfig;
use crate::state::view_state::ViewState;
use crate::types::{RankedAsset, RankingKind};
use crate::utils::format::{external_url, format_currency, format_signed_percent};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    /// 1-based position in the ranking
    pub rank: usize,
    pub symbol: String,
    pub price: String,
    pub change: String,
    pub is_positive: bool,
    pub external_url: String,
    pub volume_change: Option<String>,
}

impl DisplayRow {
    pub fn from_asset(rank: usize, asset: &RankedAsset, link_base: &str) -> Self {
        Self {
            rank,
            symbol: asset.symbol.clone(),
            price: format_currency(asset.current_price),
            change: format_signed_percent(asset.percent_change),
            is_positive: asset.is_gaining(),
            external_url: external_url(link_base, &asset.symbol),
            volume_change: asset
                .volume_change_percent
                .map(|_| format_signed_percent(asset.volume_change_or_zero())),
        }
    }
}

/// First `limit` assets as display rows
pub fn display_rows(assets: &[RankedAsset], limit: usize, link_base: &str) -> Vec<DisplayRow> {
    assets
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, asset)| DisplayRow::from_asset(idx + 1, asset, link_base))
        .collect()
}

/// Connection badge shown above the tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBadge {
    pub is_connected: bool,
    pub label: &'static str,
    /// Local wall-clock time, `HH:MM:SS`
    pub last_update: String,
}

impl StatusBadge {
    pub fn from_state(state: &ViewState) -> Self {
        Self {
            is_connected: state.is_connected,
            label: if state.is_connected { "LIVE" } else { "OFFLINE" },
            last_update: format_clock(state.last_update),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingTable {
    pub kind: RankingKind,
    /// Length of the full ranking before truncation
    pub total: usize,
    pub rows: Vec<DisplayRow>,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub badge: StatusBadge,
    pub is_stale: bool,
    pub gainers: RankingTable,
    pub losers: RankingTable,
    pub top24h: RankingTable,
    pub banner: RankingTable,
}

impl DashboardView {
    pub fn from_state(state: &ViewState, config: &FeedConfig) -> Self {
        let table = |kind: RankingKind| {
            let assets = state.ranking(kind);
            RankingTable {
                kind,
                total: assets.len(),
                rows: display_rows(assets, config.display_limit, &config.external_link_base),
            }
        };

        Self {
            badge: StatusBadge::from_state(state),
            is_stale: state.is_stale(),
            gainers: table(RankingKind::Gainers),
            losers: table(RankingKind::Losers),
            top24h: table(RankingKind::Top24h),
            banner: table(RankingKind::Banner),
        }
    }
}

fn format_clock(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::view_state::ViewUpdate;
    use crate::types::MarketSnapshot;

    const LINK_BASE: &str = "https://www.coinbase.com/price";

    #[test]
    fn test_row_formatting() {
        let row = DisplayRow::from_asset(1, &RankedAsset::new("SHIB-USD", 0.0000123, -0.0042), LINK_BASE);
        assert_eq!(row.rank, 1);
        assert_eq!(row.price, "$0.000012");
        assert_eq!(row.change, "-0.0042%");
        assert!(!row.is_positive);
        assert_eq!(row.external_url, "https://www.coinbase.com/price/shib");
        assert_eq!(row.volume_change, None);

        let row = DisplayRow::from_asset(
            2,
            &RankedAsset::new("BTC-USD", 97000.0, 2.11).with_volume_change(48.5),
            LINK_BASE,
        );
        assert_eq!(row.price, "$97,000.00");
        assert_eq!(row.change, "+2.11%");
        assert_eq!(row.volume_change.as_deref(), Some("+48.50%"));
    }

    #[test]
    fn test_rows_truncate_without_touching_source() {
        let assets: Vec<RankedAsset> = (0..20)
            .map(|i| RankedAsset::new(format!("C{i}-USD"), 1.0, f64::from(20 - i)))
            .collect();

        let rows = display_rows(&assets, 13, LINK_BASE);
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[0].symbol, "C0-USD");
        assert_eq!(rows[12].rank, 13);
        assert_eq!(assets.len(), 20);
    }

    #[test]
    fn test_dashboard_view() {
        let config = FeedConfig {
            display_limit: 1,
            ..FeedConfig::polling("http://127.0.0.1:5001/data")
        };
        let state = ViewState::initial().merged(
            ViewUpdate::snapshot(MarketSnapshot {
                gainers: vec![
                    RankedAsset::new("BTC-USD", 97000.0, 2.11),
                    RankedAsset::new("ETH-USD", 3500.0, 1.98),
                ],
                ..MarketSnapshot::default()
            })
            .connected(false),
        );

        let view = DashboardView::from_state(&state, &config);
        assert_eq!(view.badge.label, "OFFLINE");
        assert!(view.is_stale);
        assert_eq!(view.gainers.total, 2);
        assert_eq!(view.gainers.rows.len(), 1);
        assert!(view.losers.rows.is_empty());
        assert_eq!(view.banner.kind, RankingKind::Banner);
        assert_eq!(view.badge.last_update.len(), 8);
    }
}
