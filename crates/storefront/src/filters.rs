//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use tsitsi_core::Price;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount in ariary, e.g. `12 500,00 Ar`.
///
/// Accepts anything whose `Display` is a decimal number (`Decimal`, integers).
/// Values that do not parse are shown unchanged.
///
/// Usage in templates: `{{ product.price|format_price }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn format_price(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(price_text(&value.to_string()))
}

fn price_text(raw: &str) -> String {
    Decimal::from_str(raw.trim()).map_or_else(|_| raw.to_string(), |d| Price::mga(d).display())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_text() {
        assert_eq!(price_text("45000.00"), "45 000,00 Ar");
        assert_eq!(price_text("7"), "7,00 Ar");
        assert_eq!(price_text("n/a"), "n/a");
    }
}
