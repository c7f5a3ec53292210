//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tsitsi_core::{CategoryId, Price, ProductId, ProductImageId};

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl Category {
    /// Path of the category listing.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/store/category/{}", self.slug)
    }
}

/// A category with the number of available products in it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// A product as shown in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_slug: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    /// Path under the media directory, empty when the product has no picture.
    pub image: String,
    pub stock: i32,
    pub reorder_point: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price in the store currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::mga(self.price)
    }

    /// Path of the product detail page.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/store/category/{}/{}", self.category_slug, self.slug)
    }

    /// Whether at least one unit can be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.is_available && self.stock > 0
    }

    /// Whether stock has fallen to the reorder point.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.is_available && self.stock <= self.reorder_point
    }
}

/// A gallery picture.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image: String,
}

/// Catalog ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Latest,
    #[default]
    Name,
}

impl ProductSort {
    /// Parse the `sort` query parameter. Unknown values use `fallback`.
    #[must_use]
    pub fn parse(raw: Option<&str>, fallback: Self) -> Self {
        match raw.map(str::trim) {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("latest") => Self::Latest,
            Some("name") => Self::Name,
            _ => fallback,
        }
    }

    /// `ORDER BY` clause. Only ever one of these fixed strings.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id ASC",
            Self::Latest => "p.created_at DESC, p.id DESC",
            Self::Name => "p.name ASC",
        }
    }

    /// Query-string value.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Latest => "latest",
            Self::Name => "name",
        }
    }
}

/// Filter for a product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to one category.
    pub category_id: Option<CategoryId>,
    /// Case-insensitive match on name or description.
    pub keyword: Option<String>,
}

/// Staff edits to a product from the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct ProductUpdate {
    pub price: Decimal,
    pub stock: i32,
    pub reorder_point: i32,
    pub is_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse_uses_fallback() {
        assert_eq!(
            ProductSort::parse(Some("price_desc"), ProductSort::Name),
            ProductSort::PriceDesc
        );
        assert_eq!(
            ProductSort::parse(Some("bogus"), ProductSort::Latest),
            ProductSort::Latest
        );
        assert_eq!(ProductSort::parse(None, ProductSort::Name), ProductSort::Name);
    }

    #[test]
    fn test_sort_key_roundtrip() {
        for sort in [
            ProductSort::PriceAsc,
            ProductSort::PriceDesc,
            ProductSort::Latest,
            ProductSort::Name,
        ] {
            assert_eq!(ProductSort::parse(Some(sort.key()), ProductSort::Name), sort);
        }
    }
}
