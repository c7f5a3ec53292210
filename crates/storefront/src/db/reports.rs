//! Dashboard reporting queries.
//!
//! Revenue only ever counts `accepted` and `completed` orders. Best sellers
//! count every order that was not cancelled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use tsitsi_core::{Granularity, ProductId};

use super::RepositoryError;
use crate::models::report::{DashboardSummary, LowStockItem, PeriodSales, SalesPoint, TopProduct};

const REVENUE_STATUSES: &str = "('accepted', 'completed')";

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    total_orders: i64,
    completed_orders: i64,
    total_revenue: Decimal,
    available_products: i64,
    low_stock_count: i64,
    total_customers: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SalesPointRow {
    bucket: DateTime<Utc>,
    revenue: Decimal,
    order_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: Option<i32>,
    product_name: String,
    quantity_sold: i64,
    revenue: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct LowStockRow {
    id: i32,
    name: String,
    category_name: String,
    stock: i32,
    reorder_point: i32,
}

/// Repository for dashboard reports.
pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store-wide figures.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, RepositoryError> {
        let row = sqlx::query_as::<_, SummaryRow>(&format!(
            r"
            SELECT
                (SELECT COUNT(*) FROM storefront.customer_order) AS total_orders,
                (SELECT COUNT(*) FROM storefront.customer_order
                  WHERE status = 'completed') AS completed_orders,
                (SELECT COALESCE(SUM(order_total), 0) FROM storefront.customer_order
                  WHERE status IN {REVENUE_STATUSES}) AS total_revenue,
                (SELECT COUNT(*) FROM storefront.product WHERE is_available) AS available_products,
                (SELECT COUNT(*) FROM storefront.product
                  WHERE is_available AND stock <= reorder_point) AS low_stock_count,
                (SELECT COUNT(*) FROM storefront.user
                  WHERE is_active AND NOT is_staff) AS total_customers
            "
        ))
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardSummary {
            total_orders: row.total_orders,
            completed_orders: row.completed_orders,
            total_revenue: row.total_revenue,
            available_products: row.available_products,
            low_stock_count: row.low_stock_count,
            total_customers: row.total_customers,
        })
    }

    /// Revenue and order count for orders created in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn period_sales(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PeriodSales, RepositoryError> {
        let (revenue, order_count): (Decimal, i64) = sqlx::query_as(&format!(
            r"
            SELECT COALESCE(SUM(order_total), 0), COUNT(*)
            FROM storefront.customer_order
            WHERE created_at >= $1 AND created_at < $2
              AND status IN {REVENUE_STATUSES}
            "
        ))
        .bind(start)
        .bind(end)
        .fetch_one(self.pool)
        .await?;

        Ok(PeriodSales {
            revenue,
            order_count,
        })
    }

    /// Revenue per day or month within `[start, end)`. Empty buckets are
    /// omitted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn sales_series(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<SalesPoint>, RepositoryError> {
        let rows = sqlx::query_as::<_, SalesPointRow>(&format!(
            r"
            SELECT date_trunc($3, created_at, 'UTC') AS bucket,
                   COALESCE(SUM(order_total), 0) AS revenue,
                   COUNT(*) AS order_count
            FROM storefront.customer_order
            WHERE created_at >= $1 AND created_at < $2
              AND status IN {REVENUE_STATUSES}
            GROUP BY bucket
            ORDER BY bucket
            "
        ))
        .bind(start)
        .bind(end)
        .bind(granularity.as_sql())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SalesPoint {
                bucket: row.bucket,
                revenue: row.revenue,
                order_count: row.order_count,
            })
            .collect())
    }

    /// Best sellers by quantity within `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn top_products(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r"
            SELECT oi.product_id,
                   MAX(oi.product_name) AS product_name,
                   SUM(oi.quantity)::bigint AS quantity_sold,
                   SUM(oi.quantity * oi.product_price) AS revenue
            FROM storefront.order_item oi
            JOIN storefront.customer_order o ON o.id = oi.order_id
            WHERE o.created_at >= $1 AND o.created_at < $2
              AND o.status <> 'cancelled'
            GROUP BY oi.product_id, CASE WHEN oi.product_id IS NULL THEN oi.product_name END
            ORDER BY quantity_sold DESC, product_name
            LIMIT $3
            ",
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopProduct {
                product_id: row.product_id.map(ProductId::new),
                product_name: row.product_name,
                quantity_sold: row.quantity_sold,
                revenue: row.revenue,
            })
            .collect())
    }

    /// Available products at or under their reorder point, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self) -> Result<Vec<LowStockItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, LowStockRow>(
            r"
            SELECT p.id, p.name, c.name AS category_name, p.stock, p.reorder_point
            FROM storefront.product p
            JOIN storefront.category c ON c.id = p.category_id
            WHERE p.is_available AND p.stock <= p.reorder_point
            ORDER BY p.stock ASC, p.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LowStockItem {
                product_id: ProductId::new(row.id),
                name: row.name,
                category_name: row.category_name,
                stock: row.stock,
                reorder_point: row.reorder_point,
            })
            .collect())
    }
}
