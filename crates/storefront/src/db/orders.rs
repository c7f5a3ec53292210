//! Order repository.
//!
//! Orders are only ever created inside the checkout transaction, so the
//! write helpers take a `Transaction` rather than the pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use tsitsi_core::{Email, OrderId, OrderItemId, OrderNumber, OrderStatus, ProductId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::order::{Order, OrderItem, OrderWithItems, ShippingDetails};

const ORDER_COLUMNS: &str = r"
    id, order_number, user_id, first_name, last_name, phone, email,
    address_line_1, address_line_2, city, state, country, order_note,
    subtotal, tax, order_total, status, ip, created_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: OrderNumber,
    user_id: Option<i32>,
    first_name: String,
    last_name: String,
    phone: String,
    email: String,
    address_line_1: String,
    address_line_2: String,
    city: String,
    state: String,
    country: String,
    order_note: String,
    subtotal: Decimal,
    tax: Decimal,
    order_total: Decimal,
    status: OrderStatus,
    ip: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid email on order {}: {e}",
                row.order_number
            ))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            user_id: row.user_id.map(UserId::new),
            shipping: ShippingDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                phone: row.phone,
                email,
                address_line_1: row.address_line_1,
                address_line_2: row.address_line_2,
                city: row.city,
                state: row.state,
                country: row.country,
                order_note: row.order_note,
            },
            subtotal: row.subtotal,
            tax: row.tax,
            order_total: row.order_total,
            status: row.status,
            ip: row.ip,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    product_id: Option<i32>,
    product_name: String,
    size: String,
    quantity: i32,
    product_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            size: row.size,
            quantity: row.quantity,
            product_price: row.product_price,
        }
    }
}

/// Header of an order about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder<'s> {
    pub order_number: &'s OrderNumber,
    pub user_id: Option<UserId>,
    pub shipping: &'s ShippingDetails,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub order_total: Decimal,
    pub ip: Option<&'s str>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Checkout (transactional writes)
    // =========================================================================

    /// Insert an order header with status `new`.
    pub(crate) async fn insert_in(
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrder<'_>,
    ) -> Result<OrderId, RepositoryError> {
        let s = order.shipping;
        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO storefront.customer_order
                (order_number, user_id, first_name, last_name, phone, email,
                 address_line_1, address_line_2, city, state, country, order_note,
                 subtotal, tax, order_total, ip)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            ",
        )
        .bind(order.order_number)
        .bind(order.user_id)
        .bind(&s.first_name)
        .bind(&s.last_name)
        .bind(&s.phone)
        .bind(s.email.as_str())
        .bind(&s.address_line_1)
        .bind(&s.address_line_2)
        .bind(&s.city)
        .bind(&s.state)
        .bind(&s.country)
        .bind(&s.order_note)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.order_total)
        .bind(order.ip)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order number already used"))?;

        Ok(OrderId::new(id))
    }

    /// Insert one order line with its name and price snapshot.
    pub(crate) async fn insert_item_in(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        product_id: ProductId,
        product_name: &str,
        size: &str,
        quantity: i32,
        product_price: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.order_item
                (order_id, product_id, product_name, size, quantity, product_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(order_id)
        .bind(product_id)
        .bind(product_name)
        .bind(size)
        .bind(quantity)
        .bind(product_price)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Lock the product rows in ascending id order.
    ///
    /// Every checkout takes its product locks in the same order, so two
    /// carts holding the same products in different orders queue behind
    /// each other instead of deadlocking.
    pub(crate) async fn lock_products_in(
        tx: &mut Transaction<'_, Postgres>,
        product_ids: &[ProductId],
    ) -> Result<(), RepositoryError> {
        let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
        sqlx::query(
            "SELECT id FROM storefront.product WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Take `quantity` units out of stock.
    ///
    /// Returns `false` when the product is unavailable or has fewer than
    /// `quantity` units left; nothing is changed in that case.
    pub(crate) async fn reserve_stock_in(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET stock = stock - $1, updated_at = NOW()
            WHERE id = $2 AND stock >= $1 AND is_available
            ",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, product_id, product_name, size, quantity, product_price
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn with_items(&self, row: Option<OrderRow>) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;
        let items = self.items(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Get an order and its lines by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Get an order and its lines by order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE order_number = $1"
        ))
        .bind(number)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM storefront.customer_order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Every order, newest first, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM storefront.customer_order
            WHERE ($1::storefront.order_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    // =========================================================================
    // Staff
    // =========================================================================

    /// Move an order to `next`, following the status state machine.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::Conflict` if the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<OrderStatus, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(OrderStatus,)> = sqlx::query_as(
            "SELECT status FROM storefront.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((current,)) = current else {
            return Err(RepositoryError::NotFound);
        };

        let next = current
            .transition_to(next)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        sqlx::query(
            "UPDATE storefront.customer_order SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }
}
