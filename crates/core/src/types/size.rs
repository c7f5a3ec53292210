//! Cart line size.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Size chosen for a cart or order line.
///
/// Products without sizes, and submissions where the shopper left the
/// select on its placeholder, all collapse to [`Size::ONE_SIZE`]. This keeps
/// the `(cart, product, size)` key stable so repeated adds merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(String);

impl Size {
    /// Size used when none was chosen.
    pub const ONE_SIZE: &'static str = "One size";

    /// Longest size label kept; longer input is cut.
    pub const MAX_LENGTH: usize = 20;

    const PLACEHOLDERS: [&'static str; 4] = ["select", "sélectionner", "choose", "unique"];

    /// Normalise a submitted size.
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        let lowered = trimmed.to_lowercase();
        if trimmed.is_empty()
            || Self::PLACEHOLDERS.contains(&lowered.as_str())
            || trimmed.eq_ignore_ascii_case(Self::ONE_SIZE)
        {
            return Self::one_size();
        }
        Self(trimmed.chars().take(Self::MAX_LENGTH).collect())
    }

    /// The default size.
    #[must_use]
    pub fn one_size() -> Self {
        Self(Self::ONE_SIZE.to_owned())
    }

    /// Whether this is the default size.
    #[must_use]
    pub fn is_one_size(&self) -> bool {
        self.0 == Self::ONE_SIZE
    }

    /// The size label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::one_size()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Size {
    fn from(value: String) -> Self {
        Self::normalize(Some(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_placeholder_becomes_one_size() {
        assert!(Size::normalize(None).is_one_size());
        assert!(Size::normalize(Some("   ")).is_one_size());
        assert!(Size::normalize(Some("Select")).is_one_size());
        assert!(Size::normalize(Some("Sélectionner")).is_one_size());
        assert!(Size::normalize(Some("Unique")).is_one_size());
    }

    #[test]
    fn test_one_size_in_any_case_is_canonical() {
        for raw in ["one size", "ONE SIZE", " One Size "] {
            let size = Size::normalize(Some(raw));
            assert!(size.is_one_size());
            assert_eq!(size, Size::one_size());
        }
    }

    #[test]
    fn test_real_size_is_trimmed() {
        assert_eq!(Size::normalize(Some(" XL ")).as_str(), "XL");
    }

    #[test]
    fn test_long_size_is_cut() {
        let size = Size::normalize(Some(&"L".repeat(40)));
        assert_eq!(size.as_str().len(), Size::MAX_LENGTH);
    }
}
