//! Staff dashboard: reports, stock, products and orders.
//!
//! Every handler takes [`RequireStaff`], which re-reads the staff flag from
//! the database. Inline edits answer `{status, message}` JSON so the page
//! can update a single row.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use tsitsi_core::{Granularity, OrderId, OrderStatus, ProductId, ReportPeriod};

use crate::db::{CatalogRepository, OrderRepository, ReportRepository, RepositoryError};
use crate::error::{AppError, JsonError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireStaff};
use crate::models::catalog::{Product, ProductUpdate};
use crate::models::flash::{self, Level};
use crate::models::order::Order;
use crate::models::report::{DashboardSummary, LowStockItem, PeriodSales, SalesPoint, TopProduct};
use crate::state::AppState;

/// Best sellers shown for the selected window.
const TOP_PRODUCTS: i64 = 5;

/// Orders listed on the order management page.
const ORDER_LIST_LIMIT: i64 = 200;

/// Period choices offered by the dashboard selector.
const PERIOD_OPTIONS: [(&str, &str); 5] = [
    ("today", "Today"),
    ("7d", "Last 7 days"),
    ("30d", "Last 30 days"),
    ("year", "This year"),
    ("month", "Pick a month"),
];

// =============================================================================
// Query and body types
// =============================================================================

/// `?period=&month=` selector.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
    pub month: Option<String>,
}

impl PeriodQuery {
    fn resolve(&self) -> std::result::Result<ReportPeriod, tsitsi_core::ParsePeriodError> {
        ReportPeriod::from_query(self.period.as_deref(), self.month.as_deref())
    }
}

/// Stock edit sent from the low-stock report.
#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub stock: i32,
}

/// Inline product edit.
#[derive(Debug, Deserialize)]
pub struct ProductEdit {
    pub price: Decimal,
    pub stock: i32,
    pub reorder_point: i32,
    #[serde(default)]
    pub is_available: bool,
}

impl ProductEdit {
    fn validate(self) -> std::result::Result<ProductUpdate, &'static str> {
        if self.price < Decimal::ZERO {
            return Err("Price cannot be negative.");
        }
        if self.stock < 0 {
            return Err("Stock cannot be negative.");
        }
        if self.reorder_point < 0 {
            return Err("Reorder point cannot be negative.");
        }
        Ok(ProductUpdate {
            price: self.price.round_dp(2),
            stock: self.stock,
            reorder_point: self.reorder_point,
            is_available: self.is_available,
        })
    }
}

/// Result of an inline edit.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: &'static str,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
        })
    }

    fn error(status: StatusCode, message: impl Into<String>) -> Response {
        let body = Json(Self {
            status: "error",
            message: message.into(),
        });
        (status, body).into_response()
    }
}

/// Order list filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

/// Order status form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// One point of the JSON sales series.
#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub revenue: Decimal,
    pub order_count: i64,
}

/// JSON sales series for the dashboard chart.
#[derive(Debug, Serialize)]
pub struct SalesSeries {
    pub period: &'static str,
    pub label: String,
    pub granularity: Granularity,
    pub points: Vec<SeriesPoint>,
}

impl SalesSeries {
    fn new(period: &ReportPeriod, points: &[SalesPoint]) -> Self {
        let granularity = period.granularity();
        Self {
            period: period.key(),
            label: period.label(),
            granularity,
            points: points
                .iter()
                .map(|p| SeriesPoint {
                    label: p.bucket.format(granularity.label_format()).to_string(),
                    revenue: p.revenue,
                    order_count: p.order_count,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard home template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub summary: DashboardSummary,
    pub period_key: &'static str,
    pub period_label: String,
    pub month_value: String,
    pub period_options: &'static [(&'static str, &'static str)],
    pub period_error: Option<String>,
    pub sales: PeriodSales,
    pub top_products: Vec<TopProduct>,
    pub series: SalesSeries,
}

impl DashboardTemplate {
    /// Whether `key` is the selected period.
    #[must_use]
    pub fn is_period(&self, key: &str) -> bool {
        self.period_key == key
    }

    /// Whether the sales series is bucketed by month.
    #[must_use]
    pub fn is_monthly(&self) -> bool {
        self.series.granularity == Granularity::Month
    }
}

/// Low-stock report template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/low_stock.html")]
pub struct LowStockTemplate {
    pub ctx: PageContext,
    pub items: Vec<LowStockItem>,
}

/// Product management template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products.html")]
pub struct ProductsTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
}

/// Order management template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<Order>,
    pub status_filter: Option<OrderStatus>,
    pub statuses: [OrderStatus; 4],
}

impl OrdersTemplate {
    /// Whether the list is filtered to `status`.
    #[must_use]
    pub fn is_filtered_by(&self, status: &OrderStatus) -> bool {
        self.status_filter.as_ref() == Some(status)
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Dashboard home: store KPIs plus figures for the selected window.
///
/// An unusable `period` falls back to the default window with a notice.
#[instrument(skip(state, ctx, _staff, query))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse> {
    let (period, period_error) = match query.resolve() {
        Ok(period) => (period, None),
        Err(e) => (ReportPeriod::default(), Some(e.to_string())),
    };
    let (start, end) = period.window(Utc::now());

    let reports = ReportRepository::new(state.pool());
    let summary = reports.summary().await?;
    let sales = reports.period_sales(start, end).await?;
    let top_products = reports.top_products(start, end, TOP_PRODUCTS).await?;
    let points = reports
        .sales_series(start, end, period.granularity())
        .await?;

    Ok(DashboardTemplate {
        ctx,
        summary,
        period_key: period.key(),
        period_label: period.label(),
        month_value: period.month_value().unwrap_or_default(),
        period_options: &PERIOD_OPTIONS,
        period_error,
        sales,
        top_products,
        series: SalesSeries::new(&period, &points),
    })
}

/// Sales series for the selected window as JSON.
#[instrument(skip(state, _staff, query))]
pub async fn sales_api(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<PeriodQuery>,
) -> std::result::Result<Json<SalesSeries>, JsonError> {
    let period = query
        .resolve()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let (start, end) = period.window(Utc::now());

    let points = ReportRepository::new(state.pool())
        .sales_series(start, end, period.granularity())
        .await?;

    Ok(Json(SalesSeries::new(&period, &points)))
}

/// Products at or under their reorder point.
#[instrument(skip(state, ctx, _staff))]
pub async fn low_stock(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireStaff(_staff): RequireStaff,
) -> Result<impl IntoResponse> {
    let items = ReportRepository::new(state.pool()).low_stock().await?;
    Ok(LowStockTemplate { ctx, items })
}

/// Set a product's stock level.
#[instrument(skip(state, staff, body), fields(staff_id = %staff.id))]
pub async fn update_stock(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(product_id): Path<ProductId>,
    Json(body): Json<StockUpdate>,
) -> Response {
    if body.stock < 0 {
        return ActionResponse::error(StatusCode::BAD_REQUEST, "Stock cannot be negative.");
    }

    match CatalogRepository::new(state.pool())
        .set_stock(product_id, body.stock)
        .await
    {
        Ok(product) => {
            tracing::info!(product_id = %product.id, stock = product.stock, "Stock updated");
            ActionResponse::success(format!(
                "Stock for {} set to {}.",
                product.name, product.stock
            ))
            .into_response()
        }
        Err(e) => repository_failure(e),
    }
}

// =============================================================================
// Products
// =============================================================================

/// Every product, available or not.
#[instrument(skip(state, ctx, _staff))]
pub async fn products(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireStaff(_staff): RequireStaff,
) -> Result<impl IntoResponse> {
    let products = CatalogRepository::new(state.pool()).list_all().await?;
    Ok(ProductsTemplate { ctx, products })
}

/// Inline update of price, stock, reorder point and availability.
#[instrument(skip(state, staff, body), fields(staff_id = %staff.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(product_id): Path<ProductId>,
    Json(body): Json<ProductEdit>,
) -> Response {
    let update = match body.validate() {
        Ok(update) => update,
        Err(message) => return ActionResponse::error(StatusCode::BAD_REQUEST, message),
    };

    match CatalogRepository::new(state.pool())
        .update_product(product_id, update)
        .await
    {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product updated");
            ActionResponse::success(format!("{} updated.", product.name)).into_response()
        }
        Err(e) => repository_failure(e),
    }
}

/// Delete a product. Past orders keep their snapshot lines.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(product_id): Path<ProductId>,
) -> Response {
    match CatalogRepository::new(state.pool())
        .delete_product(product_id)
        .await
    {
        Ok(()) => {
            tracing::info!(%product_id, "Product deleted");
            ActionResponse::success("Product deleted.").into_response()
        }
        Err(e) => repository_failure(e),
    }
}

fn repository_failure(err: RepositoryError) -> Response {
    match err {
        RepositoryError::NotFound => {
            ActionResponse::error(StatusCode::NOT_FOUND, "Product not found.")
        }
        RepositoryError::Conflict(message) => {
            ActionResponse::error(StatusCode::CONFLICT, message)
        }
        other => {
            let err = AppError::from(other);
            let event_id = sentry::capture_error(&err);
            tracing::error!(error = %err, sentry_event_id = %event_id, "Dashboard edit failed");
            ActionResponse::error(err.status(), err.public_message())
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Recent orders, optionally filtered by status.
#[instrument(skip(state, ctx, _staff, query))]
pub async fn orders(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse> {
    let status_filter = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let orders = OrderRepository::new(state.pool())
        .list_all(status_filter, ORDER_LIST_LIMIT)
        .await?;

    Ok(OrdersTemplate {
        ctx,
        orders,
        status_filter,
        statuses: OrderStatus::ALL,
    })
}

/// Move an order along the status state machine.
#[instrument(skip(state, session, staff, form), fields(staff_id = %staff.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(order_id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let back = Redirect::to("/dashboard/orders");

    let Ok(next) = form.status.parse::<OrderStatus>() else {
        flash::push(&session, Level::Error, "Unknown order status.").await;
        return Ok(back);
    };

    match OrderRepository::new(state.pool())
        .update_status(order_id, next)
        .await
    {
        Ok(status) => {
            tracing::info!(%order_id, %status, "Order status changed");
            flash::push(
                &session,
                Level::Success,
                format!("Order marked as {}.", status.label()),
            )
            .await;
        }
        Err(RepositoryError::Conflict(message)) => {
            flash::push(&session, Level::Error, super::sentence_case(&message)).await;
        }
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound(format!("order {order_id}")));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(back)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn edit(price: i64, stock: i32, reorder_point: i32) -> ProductEdit {
        ProductEdit {
            price: Decimal::new(price, 0),
            stock,
            reorder_point,
            is_available: true,
        }
    }

    #[test]
    fn test_product_edit_rejects_negative_values() {
        assert_eq!(edit(-1, 1, 1).validate().err(), Some("Price cannot be negative."));
        assert_eq!(edit(1, -1, 1).validate().err(), Some("Stock cannot be negative."));
        assert_eq!(
            edit(1, 1, -1).validate().err(),
            Some("Reorder point cannot be negative.")
        );
    }

    #[test]
    fn test_product_edit_rounds_price() {
        let mut body = edit(0, 4, 2);
        body.price = Decimal::new(12_345_678, 3);
        let update = body.validate().unwrap();
        assert_eq!(update.price, Decimal::new(1_234_568, 2));
        assert_eq!(update.stock, 4);
    }

    #[test]
    fn test_edit_body_accepts_price_as_string() {
        let body: ProductEdit =
            serde_json::from_str(r#"{"price":"45000.00","stock":3,"reorder_point":5}"#).unwrap();
        assert_eq!(body.price, Decimal::new(45_000, 0));
        assert!(!body.is_available);
    }

    #[test]
    fn test_series_labels_follow_granularity() {
        let points = [SalesPoint {
            bucket: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            revenue: Decimal::new(90_000, 0),
            order_count: 2,
        }];

        let daily = SalesSeries::new(&ReportPeriod::Last7Days, &points);
        assert_eq!(daily.points[0].label, "2026-03-01");
        assert_eq!(daily.period, "7d");

        let monthly = SalesSeries::new(&ReportPeriod::ThisYear, &points);
        assert_eq!(monthly.granularity, Granularity::Month);
        assert_eq!(monthly.points[0].label, "2026-03");
    }

    #[test]
    fn test_invalid_period_is_reported() {
        let query = PeriodQuery {
            period: Some("month".to_owned()),
            month: Some("March".to_owned()),
        };
        assert!(query.resolve().is_err());
        assert_eq!(PeriodQuery::default().resolve().unwrap(), ReportPeriod::Last30Days);
    }
}
