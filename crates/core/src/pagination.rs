//! Page arithmetic for catalog listings.

use serde::Serialize;

/// A resolved page within a listing.
///
/// Out-of-range page requests are clamped rather than rejected: a page past
/// the end shows the last page, anything unparsable shows the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based page number after clamping.
    pub number: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of matching items.
    pub total_items: i64,
    /// Number of pages (at least 1, even when empty).
    pub total_pages: u32,
}

impl Page {
    /// Resolve a requested page against the item count.
    #[must_use]
    pub fn resolve(requested: Option<&str>, per_page: u32, total_items: i64) -> Self {
        let per_page = per_page.max(1);
        let total = u64::try_from(total_items).unwrap_or(0);
        let pages = total.div_ceil(u64::from(per_page)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);

        let number = requested
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .clamp(1, total_pages);

        Self {
            number,
            per_page,
            total_items,
            total_pages,
        }
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.per_page)
    }

    /// Previous page number, if any.
    #[must_use]
    pub const fn previous(&self) -> Option<u32> {
        if self.number > 1 {
            Some(self.number - 1)
        } else {
            None
        }
    }

    /// Next page number, if any.
    #[must_use]
    pub const fn next(&self) -> Option<u32> {
        if self.number < self.total_pages {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Whether more than one page exists.
    #[must_use]
    pub const fn is_paginated(&self) -> bool {
        self.total_pages > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_by_default() {
        let page = Page::resolve(None, 12, 30);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 12);
        assert_eq!(page.previous(), None);
        assert_eq!(page.next(), Some(2));
    }

    #[test]
    fn test_non_numeric_page_is_first() {
        assert_eq!(Page::resolve(Some("abc"), 12, 30).number, 1);
        assert_eq!(Page::resolve(Some("-2"), 12, 30).number, 1);
        assert_eq!(Page::resolve(Some("0"), 12, 30).number, 1);
    }

    #[test]
    fn test_page_past_end_is_last() {
        let page = Page::resolve(Some("99"), 12, 30);
        assert_eq!(page.number, 3);
        assert_eq!(page.offset(), 24);
        assert_eq!(page.next(), None);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page = Page::resolve(Some("4"), 12, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.is_paginated());
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(Page::resolve(None, 12, 24).total_pages, 2);
        assert_eq!(Page::resolve(None, 12, 25).total_pages, 3);
    }
}
