//! Human-readable order numbers.
//!
//! Format: `TS-{YYYYMMDDHHMMSS}-{user id or 0}-{suffix}` where the suffix is
//! four uppercase alphanumerics supplied by the caller. The database keeps a
//! unique constraint on the column, so a collision fails the insert rather
//! than producing two orders with the same number.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// An order's public identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix shared by every order number.
    pub const PREFIX: &'static str = "TS";

    /// Length of the random suffix.
    pub const SUFFIX_LEN: usize = 4;

    /// Build an order number.
    ///
    /// `suffix` is normalised to uppercase and padded or cut to
    /// [`Self::SUFFIX_LEN`] characters; non-alphanumerics are dropped.
    #[must_use]
    pub fn generate(placed_at: DateTime<Utc>, user: Option<UserId>, suffix: &str) -> Self {
        let mut clean: String = suffix
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .take(Self::SUFFIX_LEN)
            .collect();
        while clean.len() < Self::SUFFIX_LEN {
            clean.push('0');
        }

        Self(format!(
            "{}-{}-{}-{}",
            Self::PREFIX,
            placed_at.format("%Y%m%d%H%M%S"),
            user.map_or(0, |id| id.as_i32()),
            clean
        ))
    }

    /// Wrap a value read from storage or a URL.
    ///
    /// Returns `None` unless the value has the generated shape.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('-');
        let prefix = parts.next()?;
        let stamp = parts.next()?;
        let user = parts.next()?;
        let suffix = parts.next()?;
        let well_formed = prefix == Self::PREFIX
            && stamp.len() == 14
            && stamp.bytes().all(|b| b.is_ascii_digit())
            && !user.is_empty()
            && user.bytes().all(|b| b.is_ascii_digit())
            && suffix.len() == Self::SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            && parts.next().is_none();
        well_formed.then(|| Self(s.to_owned()))
    }

    /// The order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn placed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_generate_format() {
        let number = OrderNumber::generate(placed_at(), Some(UserId::new(42)), "a1b2");
        assert_eq!(number.as_str(), "TS-20240309140507-42-A1B2");
    }

    #[test]
    fn test_generate_guest_uses_zero() {
        let number = OrderNumber::generate(placed_at(), None, "ZZZZ");
        assert_eq!(number.as_str(), "TS-20240309140507-0-ZZZZ");
    }

    #[test]
    fn test_generate_normalises_suffix() {
        let short = OrderNumber::generate(placed_at(), None, "x");
        assert!(short.as_str().ends_with("-X000"));
        let long = OrderNumber::generate(placed_at(), None, "ab-cdefg");
        assert!(long.as_str().ends_with("-ABCD"));
    }

    #[test]
    fn test_same_user_same_day_differs_by_suffix() {
        let a = OrderNumber::generate(placed_at(), Some(UserId::new(1)), "AAAA");
        let b = OrderNumber::generate(placed_at(), Some(UserId::new(1)), "BBBB");
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_generated() {
        let number = OrderNumber::generate(placed_at(), Some(UserId::new(7)), "Q9W8");
        assert_eq!(OrderNumber::parse(number.as_str()), Some(number));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(OrderNumber::parse("").is_none());
        assert!(OrderNumber::parse("TSITI-1-20240309").is_none());
        assert!(OrderNumber::parse("TS-2024030914050-1-AAAA").is_none());
        assert!(OrderNumber::parse("TS-20240309140507-1-aaaa").is_none());
        assert!(OrderNumber::parse("TS-20240309140507-1-AAAA-X").is_none());
    }
}
