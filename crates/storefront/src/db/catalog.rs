//! Catalog repository: categories, products and galleries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use tsitsi_core::pagination::Page;
use tsitsi_core::{CategoryId, ProductId, ProductImageId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::catalog::{
    Category, CategoryWithCount, Product, ProductFilter, ProductImage, ProductSort, ProductUpdate,
};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.category_id, c.name AS category_name, c.slug AS category_slug,
           p.name, p.slug, p.description, p.price, p.image, p.stock, p.reorder_point,
           p.is_available, p.created_at, p.updated_at
    FROM storefront.product p
    JOIN storefront.category c ON c.id = p.category_id
";

/// Shared `WHERE` for listings: `$1` category id, `$2` `ILIKE` pattern.
const LISTING_FILTER: &str = r"
    WHERE p.is_available
      AND ($1::int IS NULL OR p.category_id = $1)
      AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryCountRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    product_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    category_id: i32,
    category_name: String,
    category_slug: String,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    image: String,
    stock: i32,
    reorder_point: i32,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            category_name: row.category_name,
            category_slug: row.category_slug,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            image: row.image,
            stock: row.stock,
            reorder_point: row.reorder_point,
            is_available: row.is_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductImageRow {
    id: i32,
    product_id: i32,
    image: String,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: ProductImageId::new(row.id),
            product_id: ProductId::new(row.product_id),
            image: row.image,
        }
    }
}

/// A product to insert (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub stock: i32,
    pub reorder_point: i32,
    pub is_available: bool,
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM storefront.category ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// All categories with their number of available products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_with_counts(&self) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r"
            SELECT c.id, c.name, c.slug, c.description,
                   COUNT(p.id) FILTER (WHERE p.is_available) AS product_count
            FROM storefront.category c
            LEFT JOIN storefront.product p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryWithCount {
                category: row.category.into(),
                product_count: row.product_count,
            })
            .collect())
    }

    /// Find a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM storefront.category WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO storefront.category (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category already exists"))?;

        Ok(row.into())
    }

    // =========================================================================
    // Storefront listings
    // =========================================================================

    /// The newest available products, for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest_available(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.is_available ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Number of available products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_available(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM storefront.product p {LISTING_FILTER}"
        ))
        .bind(filter.category_id)
        .bind(filter.keyword.as_deref().map(like_pattern))
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// One page of available products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_available(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: &Page,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} {LISTING_FILTER} ORDER BY {} LIMIT $3 OFFSET $4",
            sort.order_by()
        ))
        .bind(filter.category_id)
        .bind(filter.keyword.as_deref().map(like_pattern))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID, whether or not it is available.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Get an available product by its category and product slugs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slugs(
        &self,
        category_slug: &str,
        product_slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE c.slug = $1 AND p.slug = $2 AND p.is_available"
        ))
        .bind(category_slug)
        .bind(product_slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Gallery pictures of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn gallery(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            r"
            SELECT id, product_id, image
            FROM storefront.product_image
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    /// Add a gallery picture.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_gallery_image(
        &self,
        product_id: ProductId,
        image: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ProductImageRow>(
            r"
            INSERT INTO storefront.product_image (product_id, image)
            VALUES ($1, $2)
            RETURNING id, product_id, image
            ",
        )
        .bind(product_id)
        .bind(image)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Units of this product sold on orders that were not cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn times_purchased(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(oi.quantity), 0)::bigint
            FROM storefront.order_item oi
            JOIN storefront.customer_order o ON o.id = oi.order_id
            WHERE oi.product_id = $1 AND o.status <> 'cancelled'
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }

    // =========================================================================
    // Staff management
    // =========================================================================

    /// Every product, available or not, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO storefront.product
                (category_id, name, slug, description, price, image, stock,
                 reorder_point, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .bind(product.stock)
        .bind(product.reorder_point)
        .bind(product.is_available)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product already exists"))?;

        self.get_product(ProductId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply staff edits to price, stock, reorder point and availability.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET price = $2, stock = $3, reorder_point = $4, is_available = $5,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.price)
        .bind(update.stock)
        .bind(update.reorder_point)
        .bind(update.is_available)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Set the stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, stock: i32) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.product SET stock = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(stock)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Order lines keep their name and price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("robe"), "%robe%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
