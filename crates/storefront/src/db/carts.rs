//! Cart repository.
//!
//! A cart belongs to either an anonymous session key or a user. Lines are
//! unique per `(cart, product, size)`; adding the same combination again
//! sums quantities instead of creating a second line.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use tsitsi_core::pricing::TaxRate;
use tsitsi_core::{CartId, CartItemId, ProductId, Size, UserId};

use super::RepositoryError;
use crate::models::cart::{CartContents, CartLine, CartOwner, DecrementOutcome, IncrementOutcome};

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    product_name: String,
    product_slug: String,
    category_slug: String,
    image: String,
    size: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
    stock: i32,
    is_available: bool,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            product_url: format!("/store/category/{}/{}", row.category_slug, row.product_slug),
            image: row.image,
            size: Size::from(row.size),
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
            stock: row.stock,
            is_available: row.is_available,
        }
    }
}

const LINE_SELECT: &str = r"
    SELECT ci.id, ci.cart_id, ci.product_id, p.name AS product_name,
           p.slug AS product_slug, c.slug AS category_slug, p.image,
           ci.size, ci.quantity, p.price AS unit_price, ci.line_total,
           p.stock, p.is_available
    FROM storefront.cart_item ci
    JOIN storefront.product p ON p.id = ci.product_id
    JOIN storefront.category c ON c.id = p.category_id
    WHERE ci.cart_id = $1 AND ci.is_active
    ORDER BY ci.id
";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the owner's cart without creating one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, owner: &CartOwner) -> Result<Option<CartId>, RepositoryError> {
        let row: Option<(i32,)> = match owner {
            CartOwner::Session(key) => {
                sqlx::query_as("SELECT id FROM storefront.cart WHERE session_key = $1")
                    .bind(key)
                    .fetch_optional(self.pool)
                    .await?
            }
            CartOwner::User(user_id) => {
                sqlx::query_as("SELECT id FROM storefront.cart WHERE user_id = $1")
                    .bind(*user_id)
                    .fetch_optional(self.pool)
                    .await?
            }
        };

        Ok(row.map(|(id,)| CartId::new(id)))
    }

    /// Find or create the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, owner: &CartOwner) -> Result<CartId, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row.
        let (id,): (i32,) = match owner {
            CartOwner::Session(key) => {
                sqlx::query_as(
                    r"
                    INSERT INTO storefront.cart (session_key) VALUES ($1)
                    ON CONFLICT (session_key) DO UPDATE SET session_key = EXCLUDED.session_key
                    RETURNING id
                    ",
                )
                .bind(key)
                .fetch_one(self.pool)
                .await?
            }
            CartOwner::User(user_id) => {
                sqlx::query_as(
                    r"
                    INSERT INTO storefront.cart (user_id) VALUES ($1)
                    ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
                    RETURNING id
                    ",
                )
                .bind(*user_id)
                .fetch_one(self.pool)
                .await?
            }
        };

        Ok(CartId::new(id))
    }

    /// Add `quantity` units of a product in `size`.
    ///
    /// Returns `NotFound` when the product does not exist or is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` or `RepositoryError::Database`.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        size: &Size,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, size, quantity, line_total)
            SELECT $1, p.id, $3, $4, p.price * $4
            FROM storefront.product p
            WHERE p.id = $2 AND p.is_available
            ON CONFLICT (cart_id, product_id, size) DO UPDATE
            SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                line_total = (storefront.cart_item.quantity + EXCLUDED.quantity)
                             * (EXCLUDED.line_total / EXCLUDED.quantity),
                is_active = TRUE
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(size.as_str())
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add one unit to a line, unless that would exceed the product's stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    #[instrument(skip(self))]
    pub async fn increment(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<IncrementOutcome, RepositoryError> {
        let row: Option<(bool,)> = sqlx::query_as(
            r"
            WITH target AS (
                SELECT ci.id, ci.quantity < p.stock AS has_room
                FROM storefront.cart_item ci
                JOIN storefront.product p ON p.id = ci.product_id
                WHERE ci.id = $2 AND ci.cart_id = $1
            ), bumped AS (
                UPDATE storefront.cart_item ci
                SET quantity = ci.quantity + 1,
                    line_total = (ci.quantity + 1) * p.price
                FROM storefront.product p, target t
                WHERE ci.id = t.id AND t.has_room AND p.id = ci.product_id
                RETURNING ci.id
            )
            SELECT EXISTS (SELECT 1 FROM bumped) FROM target
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            None => Err(RepositoryError::NotFound),
            Some((true,)) => Ok(IncrementOutcome::Incremented),
            Some((false,)) => Ok(IncrementOutcome::AtStockLimit),
        }
    }

    /// Remove one unit from a line; a line holding one unit is deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    #[instrument(skip(self))]
    pub async fn decrement(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<DecrementOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i32,)> = sqlx::query_as(
            "SELECT quantity FROM storefront.cart_item WHERE id = $1 AND cart_id = $2 FOR UPDATE",
        )
        .bind(item_id)
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match current {
            None => return Err(RepositoryError::NotFound),
            Some((quantity,)) if quantity <= 1 => {
                sqlx::query("DELETE FROM storefront.cart_item WHERE id = $1")
                    .bind(item_id)
                    .execute(&mut *tx)
                    .await?;
                DecrementOutcome::Removed
            }
            Some(_) => {
                sqlx::query(
                    r"
                    UPDATE storefront.cart_item ci
                    SET quantity = ci.quantity - 1,
                        line_total = (ci.quantity - 1) * p.price
                    FROM storefront.product p
                    WHERE ci.id = $1 AND p.id = ci.product_id
                    ",
                )
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
                DecrementOutcome::Decremented
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn remove(&self, cart_id: CartId, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Lines of a cart, joined with their products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(LINE_SELECT)
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Lines of a cart, locked for the rest of the transaction.
    pub(crate) async fn lines_for_update(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!("{LINE_SELECT} FOR UPDATE OF ci"))
            .bind(cart_id)
            .fetch_all(&mut **tx)
            .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Delete every line of a cart inside a transaction.
    pub(crate) async fn clear_in(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// The owner's cart with totals. An owner without a cart gets an empty one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn contents(
        &self,
        owner: &CartOwner,
        rate: TaxRate,
    ) -> Result<CartContents, RepositoryError> {
        let Some(cart_id) = self.find(owner).await? else {
            return Ok(CartContents::empty());
        };
        let lines = self.lines(cart_id).await?;
        Ok(CartContents::from_lines(cart_id, lines, rate))
    }

    /// Sum of quantities in the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn item_count(&self, owner: &CartOwner) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = match owner {
            CartOwner::Session(key) => {
                sqlx::query_as(
                    r"
                    SELECT COALESCE(SUM(ci.quantity), 0)::bigint
                    FROM storefront.cart_item ci
                    JOIN storefront.cart c ON c.id = ci.cart_id
                    WHERE c.session_key = $1 AND ci.is_active
                    ",
                )
                .bind(key)
                .fetch_one(self.pool)
                .await?
            }
            CartOwner::User(user_id) => {
                sqlx::query_as(
                    r"
                    SELECT COALESCE(SUM(ci.quantity), 0)::bigint
                    FROM storefront.cart_item ci
                    JOIN storefront.cart c ON c.id = ci.cart_id
                    WHERE c.user_id = $1 AND ci.is_active
                    ",
                )
                .bind(*user_id)
                .fetch_one(self.pool)
                .await?
            }
        };

        Ok(count)
    }

    /// Move a session cart into the user's cart, summing quantities of
    /// matching `(product, size)` lines. The session cart is deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, session_key))]
    pub async fn merge_into_user(
        &self,
        session_key: &str,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let source: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM storefront.cart WHERE session_key = $1 FOR UPDATE")
                .bind(session_key)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((source_id,)) = source else {
            return Ok(());
        };

        let (target_id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO storefront.cart (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, size, quantity, line_total)
            SELECT $2, ci.product_id, ci.size, ci.quantity, ci.quantity * p.price
            FROM storefront.cart_item ci
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ON CONFLICT (cart_id, product_id, size) DO UPDATE
            SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                line_total = (storefront.cart_item.quantity + EXCLUDED.quantity)
                             * (EXCLUDED.line_total / EXCLUDED.quantity),
                is_active = TRUE
            ",
        )
        .bind(source_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
