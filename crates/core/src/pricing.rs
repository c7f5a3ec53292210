//! Cart and order totals.
//!
//! The cart page, the checkout summary and the stored order all go through
//! [`Totals::compute`], so the figure a shopper confirms is the figure
//! persisted on the order.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`TaxRate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxRateError {
    /// The rate is not a decimal number.
    #[error("tax rate must be a decimal number such as 0.18")]
    Invalid,
    /// The rate is negative or above 100%.
    #[error("tax rate must be between 0 and 1, got {0}")]
    OutOfRange(Decimal),
}

/// Sales tax as a fraction of the subtotal (0.18 = 18%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Create a tax rate.
    ///
    /// # Errors
    ///
    /// Returns [`TaxRateError::OutOfRange`] unless `0 <= rate <= 1`.
    pub fn new(rate: Decimal) -> Result<Self, TaxRateError> {
        if rate.is_sign_negative() || rate > Decimal::ONE {
            return Err(TaxRateError::OutOfRange(rate));
        }
        Ok(Self(rate))
    }

    /// Parse a rate from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a decimal in `0..=1`.
    pub fn parse(s: &str) -> Result<Self, TaxRateError> {
        let rate: Decimal = s.trim().parse().map_err(|_| TaxRateError::Invalid)?;
        Self::new(rate)
    }

    /// The rate as a fraction.
    #[must_use]
    pub const fn as_decimal(self) -> Decimal {
        self.0
    }

    /// The rate as a whole-number percentage for display, e.g. `18`.
    #[must_use]
    pub fn percent(self) -> Decimal {
        (self.0 * Decimal::ONE_HUNDRED).normalize()
    }

    /// Tax owed on `subtotal`, rounded half away from zero to two places.
    #[must_use]
    pub fn tax_on(self, subtotal: Decimal) -> Decimal {
        (subtotal * self.0).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self(Decimal::new(18, 2))
    }
}

/// Subtotal, tax and grand total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of `quantity * unit price` over all lines.
    pub subtotal: Decimal,
    /// Tax on the subtotal.
    pub tax: Decimal,
    /// `subtotal + tax`.
    pub total: Decimal,
    /// Sum of quantities.
    pub item_count: i64,
}

impl Totals {
    /// Compute totals from `(unit_price, quantity)` pairs.
    #[must_use]
    pub fn compute<I>(lines: I, rate: TaxRate) -> Self
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let (subtotal, item_count) = lines
            .into_iter()
            .fold((Decimal::ZERO, 0_i64), |(sum, count), (price, qty)| {
                (sum + line_total(price, qty), count + i64::from(qty))
            });
        let tax = rate.tax_on(subtotal);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
            item_count,
        }
    }
}

/// Total for one line.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_rate_is_eighteen_percent() {
        assert_eq!(TaxRate::default().as_decimal(), dec("0.18"));
        assert_eq!(TaxRate::default().percent(), dec("18"));
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(TaxRate::parse("0.2").unwrap().as_decimal(), dec("0.2"));
        assert_eq!(TaxRate::parse("abc"), Err(TaxRateError::Invalid));
        assert!(matches!(TaxRate::parse("1.5"), Err(TaxRateError::OutOfRange(_))));
        assert!(matches!(TaxRate::parse("-0.1"), Err(TaxRateError::OutOfRange(_))));
    }

    #[test]
    fn test_totals_sum_lines_then_tax() {
        let totals = Totals::compute(
            [(dec("12500.00"), 2), (dec("3000.50"), 1)],
            TaxRate::default(),
        );
        assert_eq!(totals.subtotal, dec("28000.50"));
        assert_eq!(totals.tax, dec("5040.09"));
        assert_eq!(totals.total, dec("33040.59"));
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        let rate = TaxRate::new(dec("0.5")).unwrap();
        assert_eq!(rate.tax_on(dec("0.01")), dec("0.01"));
        assert_eq!(rate.tax_on(dec("0.03")), dec("0.02"));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = Totals::compute(std::iter::empty(), TaxRate::default());
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_total_is_subtotal_plus_tax() {
        for qty in 1..20 {
            let totals = Totals::compute([(dec("999.99"), qty)], TaxRate::default());
            assert_eq!(totals.total, totals.subtotal + totals.tax);
            assert_eq!(totals.subtotal, line_total(dec("999.99"), qty));
        }
    }
}
