//! Review rating on a 1-7 scale.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside `1..=7`.
    #[error("rating must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Rejected value.
        value: i64,
        /// Lowest allowed rating.
        min: i16,
        /// Highest allowed rating.
        max: i16,
    },
    /// The input is not a number.
    #[error("rating must be a whole number")]
    NotANumber,
}

/// A product rating, 1 (worst) through 7 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rating(i16);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: i16 = 1;
    /// Highest allowed rating.
    pub const MAX: i16 = 7;

    /// Create a rating from a number.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] outside `1..=7`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        i16::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
    }

    /// Parse a rating from form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an integer in `1..=7`.
    pub fn parse(s: &str) -> Result<Self, RatingError> {
        let value: i64 = s.trim().parse().map_err(|_| RatingError::NotANumber)?;
        Self::new(value)
    }

    /// The numeric value.
    #[must_use]
    pub const fn value(self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::try_from(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_scale() {
        for v in 1..=7 {
            assert_eq!(Rating::new(v).unwrap().value(), i16::try_from(v).unwrap());
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            Rating::new(0),
            Err(RatingError::OutOfRange { value: 0, .. })
        ));
        assert!(Rating::new(8).is_err());
        assert!(Rating::new(i64::from(i16::MAX) + 1).is_err());
    }

    #[test]
    fn test_parse_form_input() {
        assert_eq!(Rating::parse(" 5 ").unwrap().value(), 5);
        assert_eq!(Rating::parse("five"), Err(RatingError::NotANumber));
        assert_eq!(Rating::parse("4.5"), Err(RatingError::NotANumber));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Rating>("6").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }
}
