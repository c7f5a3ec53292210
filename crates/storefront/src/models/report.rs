//! Dashboard reporting types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tsitsi_core::ProductId;

/// Store-wide figures shown at the top of the dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSummary {
    pub total_orders: i64,
    pub completed_orders: i64,
    /// Sum of order totals over accepted and completed orders.
    pub total_revenue: Decimal,
    pub available_products: i64,
    pub low_stock_count: i64,
    /// Active customers, staff excluded.
    pub total_customers: i64,
}

/// Revenue and order count within a report window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodSales {
    pub revenue: Decimal,
    pub order_count: i64,
}

/// One bucket of a sales series.
#[derive(Debug, Clone, Serialize)]
pub struct SalesPoint {
    pub bucket: DateTime<Utc>,
    pub revenue: Decimal,
    pub order_count: i64,
}

/// A best seller within a window.
#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

/// A product at or under its reorder point.
#[derive(Debug, Clone, Serialize)]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub name: String,
    pub category_name: String,
    pub stock: i32,
    pub reorder_point: i32,
}
