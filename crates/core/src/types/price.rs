//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are stored as `NUMERIC(10,2)` and read straight into
//! [`Decimal`]; this type pairs the amount with its currency for display.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (ariary, not iraimbilanja).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in the store currency.
    #[must_use]
    pub const fn mga(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::MGA)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display, e.g. `12 500,00 Ar`.
    ///
    /// Uses a space as thousands separator and a comma for decimals, which
    /// is how prices are written in Madagascar.
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{} {}",
            format_amount(self.amount),
            self.currency_code.symbol()
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format a decimal amount with two places, space-grouped thousands and a
/// decimal comma.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped},{cents}")
    } else {
        format!("{grouped},{cents}")
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Malagasy ariary, the store currency.
    #[default]
    MGA,
    EUR,
    USD,
}

impl CurrencyCode {
    /// Symbol written after the amount.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::MGA => "Ar",
            Self::EUR => "€",
            Self::USD => "$",
        }
    }

    /// The three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MGA => "MGA",
            Self::EUR => "EUR",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(Decimal::new(1_250_000, 2)), "12 500,00");
        assert_eq!(format_amount(Decimal::new(123_456_789, 2)), "1 234 567,89");
        assert_eq!(format_amount(Decimal::new(999, 0)), "999,00");
        assert_eq!(format_amount(Decimal::ZERO), "0,00");
    }

    #[test]
    fn test_format_amount_rounds_and_keeps_sign() {
        assert_eq!(format_amount(Decimal::new(10_005, 3)), "10,00");
        assert_eq!(format_amount(Decimal::new(-150_000, 2)), "-1 500,00");
    }

    #[test]
    fn test_display_appends_symbol() {
        let price = Price::mga(Decimal::new(45_000, 0));
        assert_eq!(price.to_string(), "45 000,00 Ar");
    }

    #[test]
    fn test_times_multiplies_amount() {
        let unit = Price::mga(Decimal::new(12_500, 0));
        assert_eq!(unit.times(3).amount, Decimal::new(37_500, 0));
        assert_eq!(unit.times(3).currency_code, CurrencyCode::MGA);
    }
}
