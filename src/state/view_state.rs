use crate::types::{MarketSnapshot, RankedAsset, RankingKind};
use std::time::SystemTime;

/// Immutable view model consumed by the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Transport health, not data freshness
    pub is_connected: bool,
    /// Time of the last applied transport event
    pub last_update: SystemTime,
    pub gainers: Vec<RankedAsset>,
    pub losers: Vec<RankedAsset>,
    pub top24h: Vec<RankedAsset>,
    pub banner: Vec<RankedAsset>,
}

impl ViewState {
    /// Client-start state: disconnected, every ranking empty
    pub fn initial() -> Self {
        Self::initial_at(SystemTime::now())
    }

    pub fn initial_at(now: SystemTime) -> Self {
        Self {
            is_connected: false,
            last_update: now,
            gainers: Vec::new(),
            losers: Vec::new(),
            top24h: Vec::new(),
            banner: Vec::new(),
        }
    }

    pub fn ranking(&self, kind: RankingKind) -> &[RankedAsset] {
        match kind {
            RankingKind::Gainers => &self.gainers,
            RankingKind::Losers => &self.losers,
            RankingKind::Top24h => &self.top24h,
            RankingKind::Banner => &self.banner,
        }
    }

    pub fn has_data(&self) -> bool {
        !(self.gainers.is_empty() && self.losers.is_empty() && self.top24h.is_empty() && self.banner.is_empty())
    }

    /// Connected state of the transport says nothing about data age; a
    /// disconnected view with data is showing stale rankings.
    pub fn is_stale(&self) -> bool {
        !self.is_connected && self.has_data()
    }

    /// New value with `update` merged over this one
    pub fn merged(&self, update: ViewUpdate) -> Self {
        Self {
            is_connected: update.is_connected.unwrap_or(self.is_connected),
            last_update: update.last_update.unwrap_or(self.last_update),
            gainers: update.gainers.unwrap_or_else(|| self.gainers.clone()),
            losers: update.losers.unwrap_or_else(|| self.losers.clone()),
            top24h: update.top24h.unwrap_or_else(|| self.top24h.clone()),
            banner: update.banner.unwrap_or_else(|| self.banner.clone()),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Partial update; `None` fields keep the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewUpdate {
    pub is_connected: Option<bool>,
    pub last_update: Option<SystemTime>,
    pub gainers: Option<Vec<RankedAsset>>,
    pub losers: Option<Vec<RankedAsset>>,
    pub top24h: Option<Vec<RankedAsset>>,
    pub banner: Option<Vec<RankedAsset>>,
}

impl ViewUpdate {
    /// Connection status change only; rankings are left untouched
    pub fn connection(is_connected: bool) -> Self {
        Self {
            is_connected: Some(is_connected),
            ..Self::default()
        }
    }

    /// Replaces all four rankings at once
    pub fn snapshot(snapshot: MarketSnapshot) -> Self {
        Self {
            gainers: Some(snapshot.gainers),
            losers: Some(snapshot.losers),
            top24h: Some(snapshot.top24h),
            banner: Some(snapshot.banner),
            ..Self::default()
        }
    }

    pub fn connected(mut self, is_connected: bool) -> Self {
        self.is_connected = Some(is_connected);
        self
    }

    pub fn stamped(mut self, at: SystemTime) -> Self {
        self.last_update = Some(at);
        self
    }

    pub fn stamped_now(self) -> Self {
        self.stamped(SystemTime::now())
    }
}
