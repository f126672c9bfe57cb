use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Placeholder identifier for records that arrive without any symbol alias
pub const UNKNOWN_SYMBOL: &str = "N/A";

/// One traded instrument's current state within a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAsset {
    /// Canonical `<BASE>-<QUOTE>` identifier, e.g. `BTC-USD`
    pub symbol: String,
    /// Last traded price, never negative
    pub current_price: f64,
    /// Signed change in percentage points
    pub percent_change: f64,
    /// Volume change in percentage points, only carried by the banner ranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_change_percent: Option<f64>,
}

impl RankedAsset {
    pub fn new(symbol: impl Into<String>, current_price: f64, percent_change: f64) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
            percent_change,
            volume_change_percent: None,
        }
    }

    pub fn with_volume_change(mut self, volume_change_percent: f64) -> Self {
        self.volume_change_percent = Some(volume_change_percent);
        self
    }

    pub fn is_gaining(&self) -> bool {
        self.percent_change >= 0.0
    }

    /// Volume change for display, `0` when the feed sent none
    pub fn volume_change_or_zero(&self) -> f64 {
        self.volume_change_percent.unwrap_or(0.0)
    }
}

/// The four rankings delivered by the feed, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum RankingKind {
    Gainers,
    Losers,
    #[serde(rename = "top24h")]
    #[strum(serialize = "top24h")]
    Top24h,
    Banner,
}

impl RankingKind {
    /// Top-level payload keys accepted for this ranking, canonical key first
    pub fn wire_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Gainers => &["gainers"],
            Self::Losers => &["losers"],
            Self::Top24h => &["top24h", "mostActive"],
            Self::Banner => &["banner", "volumeSurge"],
        }
    }
}

/// One complete set of ranked lists delivered by the feed at a point in time.
/// Insertion order is rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub gainers: Vec<RankedAsset>,
    pub losers: Vec<RankedAsset>,
    pub top24h: Vec<RankedAsset>,
    pub banner: Vec<RankedAsset>,
}

impl MarketSnapshot {
    pub fn ranking(&self, kind: RankingKind) -> &[RankedAsset] {
        match kind {
            RankingKind::Gainers => &self.gainers,
            RankingKind::Losers => &self.losers,
            RankingKind::Top24h => &self.top24h,
            RankingKind::Banner => &self.banner,
        }
    }

    pub fn ranking_mut(&mut self, kind: RankingKind) -> &mut Vec<RankedAsset> {
        match kind {
            RankingKind::Gainers => &mut self.gainers,
            RankingKind::Losers => &mut self.losers,
            RankingKind::Top24h => &mut self.top24h,
            RankingKind::Banner => &mut self.banner,
        }
    }

    pub fn total_assets(&self) -> usize {
        self.gainers.len() + self.losers.len() + self.top24h.len() + self.banner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_assets() == 0
    }
}
