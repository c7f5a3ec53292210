//! Integration tests for the staff dashboard figures.
//!
//! Requires a `PostgreSQL` server reachable through `DATABASE_URL`.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tsitsi_core::{OrderId, OrderStatus, Size, pricing::TaxRate};
use tsitsi_integration_tests::{create_category, create_product, shipping_details};
use tsitsi_storefront::db::{CartRepository, OrderRepository, ReportRepository};
use tsitsi_storefront::models::cart::CartOwner;
use tsitsi_storefront::models::catalog::Product;
use tsitsi_storefront::services::checkout::CheckoutService;

/// Place a one-unit guest order and return its id and total.
async fn order_one(pool: &PgPool, product: &Product, key: &str) -> (OrderId, Decimal) {
    let carts = CartRepository::new(pool);
    let cart_id = carts
        .get_or_create(&CartOwner::Session(key.to_string()))
        .await
        .unwrap();
    carts.add_item(cart_id, product.id, &Size::one_size(), 1).await.unwrap();
    let placed = CheckoutService::new(pool, TaxRate::default())
        .place_order(cart_id, None, &shipping_details(), None)
        .await
        .unwrap();
    (placed.order_id, placed.totals.total)
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_revenue_counts_accepted_and_completed_orders(pool: PgPool) {
    let category = create_category(&pool, "Lamba").await;
    let shawl = create_product(&pool, &category, "Lamba hoany", Decimal::new(1_000, 0), 5).await;
    let orders = OrderRepository::new(&pool);

    let (accepted, accepted_total) = order_one(&pool, &shawl, "a").await;
    let (completed, completed_total) = order_one(&pool, &shawl, "b").await;
    let (cancelled, _) = order_one(&pool, &shawl, "c").await;
    let _still_new = order_one(&pool, &shawl, "d").await;

    orders.update_status(accepted, OrderStatus::Accepted).await.unwrap();
    orders.update_status(completed, OrderStatus::Completed).await.unwrap();
    orders.update_status(cancelled, OrderStatus::Cancelled).await.unwrap();

    let reports = ReportRepository::new(&pool);
    let summary = reports.summary().await.unwrap();
    assert_eq!(summary.total_orders, 4);
    assert_eq!(summary.completed_orders, 1);
    assert_eq!(summary.total_revenue, accepted_total + completed_total);
    assert_eq!(summary.total_revenue, Decimal::new(2_360, 0));
    // Four units sold from five leaves one, under the reorder point of two.
    assert_eq!(summary.low_stock_count, 1);

    let now = Utc::now();
    let period = reports
        .period_sales(now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(period.revenue, summary.total_revenue);
    assert_eq!(period.order_count, 2);

    let earlier = reports
        .period_sales(now - Duration::days(30), now - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(earlier.revenue, Decimal::ZERO);
    assert_eq!(earlier.order_count, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_terminal_orders_cannot_change_status(pool: PgPool) {
    let category = create_category(&pool, "Vannerie").await;
    let basket = create_product(&pool, &category, "Sobika", Decimal::new(4_500, 0), 5).await;
    let orders = OrderRepository::new(&pool);

    let (id, _) = order_one(&pool, &basket, "terminal").await;
    orders.update_status(id, OrderStatus::Completed).await.unwrap();

    let err = orders
        .update_status(id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tsitsi_storefront::db::RepositoryError::Conflict(_)
    ));
    let stored = orders.get(id).await.unwrap().unwrap();
    assert_eq!(stored.order.status, OrderStatus::Completed);
}
