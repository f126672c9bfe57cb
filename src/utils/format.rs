//! Display formatting for prices and percentage moves.
//!
//! Every function here is total: non-finite input renders as zero instead of
//! failing, so a single bad record never breaks a rendered table.

use super::constants::QUOTE_SUFFIX;

/// Formats a magnitude with precision that scales down for sub-cent values.
///
/// * `|value| < 0.01`: up to 6 fractional digits, trailing zeros stripped
/// * `|value| < 1`: up to 4 fractional digits, trailing zeros stripped
/// * otherwise exactly 2 fractional digits
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }

    let magnitude = value.abs();
    if magnitude < 0.01 {
        trim_fraction(&fixed(value, 6))
    } else if magnitude < 1.0 {
        trim_fraction(&fixed(value, 4))
    } else {
        fixed(value, 2)
    }
}

/// US-dollar rendering with thousands separators. Values below one dollar
/// keep 6 fractional digits.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }

    let digits = if value.abs() >= 1.0 { 2 } else { 6 };
    let rendered = fixed(value.abs(), digits);
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));

    // -0.0000001 rounds to zero and must not render as "-$0.000000"
    let negative = value < 0.0 && rendered.bytes().any(|b| (b'1'..=b'9').contains(&b));
    let sign = if negative { "-" } else { "" };

    format!("{sign}${}.{frac_part}", group_thousands(int_part))
}

/// `+1.23%` / `-0.4568%`, with zero counted as a gain
pub fn format_signed_percent(value: f64) -> String {
    let rendered = format_decimal(value);
    if rendered.starts_with('-') {
        format!("{rendered}%")
    } else {
        format!("+{rendered}%")
    }
}

/// Strips a trailing `-USD` and lower-cases the rest (`BTC-USD` -> `btc`).
/// Symbols without the suffix are only lower-cased.
pub fn derive_external_symbol(symbol: &str) -> String {
    symbol
        .strip_suffix(QUOTE_SUFFIX)
        .unwrap_or(symbol)
        .to_lowercase()
}

/// Reference link for an asset, e.g. `https://www.coinbase.com/price/btc`
pub fn external_url(link_base: &str, symbol: &str) -> String {
    format!(
        "{}/{}",
        link_base.trim_end_matches('/'),
        derive_external_symbol(symbol)
    )
}

/// Fixed-point rendering with ties rounded away from zero (`1.125` -> `1.13`)
fn fixed(value: f64, digits: usize) -> String {
    format!("{:.*}", digits, round_half_away(value, digits))
}

fn round_half_away(value: f64, digits: usize) -> f64 {
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    // past 2^52 every f64 is already whole at this scale
    if !scaled.is_finite() || scaled.abs() >= 4.5e15 {
        return value;
    }
    scaled.round() / scale
}

fn trim_fraction(fixed: &str) -> String {
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
