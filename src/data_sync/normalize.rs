//! Normalization boundary between raw feed payloads and [`MarketSnapshot`].
//!
//! All field-name aliasing lives in [`AliasTable`]; nothing downstream of this
//! module sees `product`/`product_id` or `gain`/`percent_change`.

use crate::error::FeedError;
use crate::types::{MarketSnapshot, RankedAsset, RankingKind, UNKNOWN_SYMBOL};
use serde_json::{Map, Value};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

/// Accepted wire names for each canonical asset field, in lookup priority
#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    pub symbol: &'static [&'static str],
    pub price: &'static [&'static str],
    pub change: &'static [&'static str],
    pub volume_change: &'static [&'static str],
}

pub const ASSET_ALIASES: AliasTable = AliasTable {
    symbol: &["symbol", "product", "product_id"],
    price: &["current", "currentPrice", "current_price"],
    change: &["gain", "percent_change", "percentChange"],
    volume_change: &["volume_change", "volumeChangePercent"],
};

/// Result of normalizing one payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSnapshot {
    pub snapshot: MarketSnapshot,
    /// Rankings that were absent or not arrays and fell back to empty
    pub defaulted: Vec<RankingKind>,
}

impl NormalizedSnapshot {
    pub fn is_complete(&self) -> bool {
        self.defaulted.is_empty()
    }
}

/// Parses a raw text body and normalizes it
pub fn parse_payload(text: &str) -> Result<NormalizedSnapshot, FeedError> {
    let value: Value = serde_json::from_str(text)?;
    normalize_payload(&value)
}

/// Normalizes a decoded payload.
///
/// Each ranking is defaulted independently: a missing or non-array field
/// becomes empty without affecting its siblings. Only a payload that is not a
/// JSON object at all is rejected.
pub fn normalize_payload(raw: &Value) -> Result<NormalizedSnapshot, FeedError> {
    let Some(object) = raw.as_object() else {
        return Err(FeedError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_type_name(raw)
        )));
    };

    let mut normalized = NormalizedSnapshot::default();

    for kind in RankingKind::iter() {
        match lookup_ranking(object, kind.wire_keys()) {
            Some(Value::Array(entries)) => {
                *normalized.snapshot.ranking_mut(kind) = normalize_ranking(kind, entries);
            }
            Some(other) => {
                warn!("Field '{}' is {} instead of an array, using empty list", kind, json_type_name(other));
                normalized.defaulted.push(kind);
            }
            None => {
                debug!("Field '{}' missing from payload, using empty list", kind);
                normalized.defaulted.push(kind);
            }
        }
    }

    Ok(normalized)
}

fn normalize_ranking(kind: RankingKind, entries: &[Value]) -> Vec<RankedAsset> {
    let mut assets = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match entry.as_object() {
            Some(record) => assets.push(normalize_asset(record)),
            None => debug!("Skipping non-object entry #{} in '{}'", idx, kind),
        }
    }
    assets
}

/// Resolves one record to the canonical shape. Never fails: unusable numeric
/// fields become `0` and a missing identifier becomes `N/A`.
pub fn normalize_asset(record: &Map<String, Value>) -> RankedAsset {
    // each alias is tried in turn until one holds a usable value
    let symbol = present(record, ASSET_ALIASES.symbol)
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SYMBOL)
        .to_string();

    let current_price = first_finite(record, ASSET_ALIASES.price)
        .filter(|price| *price >= 0.0)
        .unwrap_or(0.0);

    let percent_change = first_finite(record, ASSET_ALIASES.change).unwrap_or(0.0);

    // present-but-garbled still counts as "has volume data"
    let volume_change_percent = first_finite(record, ASSET_ALIASES.volume_change).or_else(|| {
        present(record, ASSET_ALIASES.volume_change)
            .any(|v| !v.is_null())
            .then_some(0.0)
    });

    RankedAsset {
        symbol,
        current_price,
        percent_change,
        volume_change_percent,
    }
}

/// Values of the aliases that are present, in alias priority
fn present<'a>(object: &'a Map<String, Value>, keys: &'a [&str]) -> impl Iterator<Item = &'a Value> {
    keys.iter().filter_map(|key| object.get(*key))
}

fn first_finite(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    present(object, keys).find_map(as_finite_f64)
}

/// First array among the aliases, else whatever value is present
fn lookup_ranking<'a>(object: &'a Map<String, Value>, keys: &'a [&str]) -> Option<&'a Value> {
    present(object, keys)
        .find(|value| value.is_array())
        .or_else(|| present(object, keys).next())
}

/// JSON numbers and numeric strings, finite only
fn as_finite_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
