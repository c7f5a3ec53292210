//! Integration tests for order placement.
//!
//! Requires a `PostgreSQL` server reachable through `DATABASE_URL`.
//! Run with: cargo test -p tsitsi-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use tsitsi_core::{OrderStatus, Size, pricing::TaxRate};
use tsitsi_integration_tests::{
    create_category, create_product, create_user, reload, shipping_details,
};
use tsitsi_storefront::db::{CartRepository, CatalogRepository, OrderRepository};
use tsitsi_storefront::models::cart::CartOwner;
use tsitsi_storefront::models::catalog::ProductUpdate;
use tsitsi_storefront::services::checkout::{CheckoutError, CheckoutService};

async fn order_count(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storefront.customer_order")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_charges_subtotal_plus_tax(pool: PgPool) {
    let category = create_category(&pool, "Lamba").await;
    let shawl = create_product(&pool, &category, "Lamba hoany", Decimal::new(1_000_000, 2), 10).await;
    let basket = create_product(&pool, &category, "Harona", Decimal::new(250_050, 2), 4).await;

    let carts = CartRepository::new(&pool);
    let owner = CartOwner::Session("checkout-totals".to_string());
    let cart_id = carts.get_or_create(&owner).await.unwrap();
    carts.add_item(cart_id, shawl.id, &Size::one_size(), 2).await.unwrap();
    carts.add_item(cart_id, basket.id, &Size::one_size(), 1).await.unwrap();

    let placed = CheckoutService::new(&pool, TaxRate::default())
        .place_order(cart_id, None, &shipping_details(), Some("127.0.0.1"))
        .await
        .unwrap();

    assert_eq!(placed.totals.subtotal, Decimal::new(2_250_050, 2));
    assert_eq!(placed.totals.tax, Decimal::new(405_009, 2));
    assert_eq!(placed.totals.total, Decimal::new(2_655_059, 2));

    let stored = OrderRepository::new(&pool)
        .get(placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.order.order_total, placed.totals.total);
    assert_eq!(stored.order.status, OrderStatus::New);
    assert_eq!(stored.order.user_id, None);
    assert_eq!(stored.items.len(), 2);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_reserves_stock_and_empties_cart(pool: PgPool) {
    let category = create_category(&pool, "Vannerie").await;
    let basket = create_product(&pool, &category, "Sobika", Decimal::new(4_500, 0), 5).await;
    let user_id = create_user(&pool, "rasoa").await;

    let carts = CartRepository::new(&pool);
    let owner = CartOwner::User(user_id);
    let cart_id = carts.get_or_create(&owner).await.unwrap();
    carts.add_item(cart_id, basket.id, &Size::one_size(), 3).await.unwrap();

    let placed = CheckoutService::new(&pool, TaxRate::default())
        .place_order(cart_id, Some(user_id), &shipping_details(), None)
        .await
        .unwrap();

    assert_eq!(reload(&pool, &basket).await.stock, 2);
    assert_eq!(carts.item_count(&owner).await.unwrap(), 0);
    assert!(carts.lines(cart_id).await.unwrap().is_empty());

    let mine = OrderRepository::new(&pool)
        .list_for_user(user_id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].order_number, placed.order_number);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_oversized_order_changes_nothing(pool: PgPool) {
    let category = create_category(&pool, "Soie").await;
    let plenty = create_product(&pool, &category, "Écharpe", Decimal::new(30_000, 0), 10).await;
    let scarce = create_product(&pool, &category, "Lamba mena", Decimal::new(90_000, 0), 2).await;

    let carts = CartRepository::new(&pool);
    let owner = CartOwner::Session("oversized".to_string());
    let cart_id = carts.get_or_create(&owner).await.unwrap();
    carts.add_item(cart_id, plenty.id, &Size::one_size(), 4).await.unwrap();
    carts.add_item(cart_id, scarce.id, &Size::one_size(), 3).await.unwrap();

    let err = CheckoutService::new(&pool, TaxRate::default())
        .place_order(cart_id, None, &shipping_details(), None)
        .await
        .unwrap_err();

    assert!(
        matches!(err, CheckoutError::InsufficientStock { ref product } if product == "Lamba mena"),
        "unexpected error: {err}"
    );
    assert_eq!(reload(&pool, &plenty).await.stock, 10);
    assert_eq!(reload(&pool, &scarce).await.stock, 2);
    assert_eq!(order_count(&pool).await, 0);
    assert_eq!(carts.item_count(&owner).await.unwrap(), 7);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_cannot_be_ordered(pool: PgPool) {
    let carts = CartRepository::new(&pool);
    let cart_id = carts
        .get_or_create(&CartOwner::Session("empty".to_string()))
        .await
        .unwrap();

    let err = CheckoutService::new(&pool, TaxRate::default())
        .place_order(cart_id, None, &shipping_details(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(order_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_stored_lines_keep_the_price_paid(pool: PgPool) {
    let category = create_category(&pool, "Vannerie").await;
    let basket = create_product(&pool, &category, "Sobika", Decimal::new(4_550, 1), 10).await;
    let hat = create_product(&pool, &category, "Satroka", Decimal::new(12_000, 0), 10).await;

    let carts = CartRepository::new(&pool);
    let cart_id = carts
        .get_or_create(&CartOwner::Session("snapshot".to_string()))
        .await
        .unwrap();
    carts.add_item(cart_id, basket.id, &Size::one_size(), 3).await.unwrap();
    carts.add_item(cart_id, hat.id, &Size::one_size(), 1).await.unwrap();

    let placed = CheckoutService::new(&pool, TaxRate::default())
        .place_order(cart_id, None, &shipping_details(), None)
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    let before = orders.get(placed.order_id).await.unwrap().unwrap();
    let lines_sum: Decimal = before
        .items
        .iter()
        .map(|item| item.product_price * Decimal::from(item.quantity))
        .sum();
    assert_eq!(lines_sum, before.order.subtotal);
    assert_eq!(
        before.order.order_total,
        before.order.subtotal + before.order.tax
    );

    CatalogRepository::new(&pool)
        .update_product(
            basket.id,
            ProductUpdate {
                price: Decimal::new(9_999, 0),
                stock: 7,
                reorder_point: 2,
                is_available: true,
            },
        )
        .await
        .unwrap();

    let after = orders.get(placed.order_id).await.unwrap().unwrap();
    let basket_line = after
        .items
        .iter()
        .find(|item| item.product_id == Some(basket.id))
        .unwrap();
    assert_eq!(basket_line.product_price, Decimal::new(4_550, 1));
    assert_eq!(after.order.subtotal, before.order.subtotal);
    assert_eq!(after.order.order_total, before.order.order_total);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_checkouts_for_last_unit(pool: PgPool) {
    let category = create_category(&pool, "Lamba").await;
    let shawl = create_product(&pool, &category, "Lamba landy", Decimal::new(150_000, 0), 1).await;

    let carts = CartRepository::new(&pool);
    let first_owner = CartOwner::Session("first".to_string());
    let second_owner = CartOwner::Session("second".to_string());
    let first = carts.get_or_create(&first_owner).await.unwrap();
    let second = carts.get_or_create(&second_owner).await.unwrap();
    carts.add_item(first, shawl.id, &Size::one_size(), 1).await.unwrap();
    carts.add_item(second, shawl.id, &Size::one_size(), 1).await.unwrap();

    let checkout = CheckoutService::new(&pool, TaxRate::default());
    let shipping = shipping_details();
    let (a, b) = tokio::join!(
        checkout.place_order(first, None, &shipping, None),
        checkout.place_order(second, None, &shipping, None),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(CheckoutError::InsufficientStock { product }) if product == "Lamba landy"
    )));
    assert_eq!(reload(&pool, &shawl).await.stock, 0);
    assert_eq!(order_count(&pool).await, 1);
    // The losing cart still holds its line.
    let remaining = carts.item_count(&first_owner).await.unwrap()
        + carts.item_count(&second_owner).await.unwrap();
    assert_eq!(remaining, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_carts_in_opposite_order_both_check_out(pool: PgPool) {
    const ROUNDS: i32 = 20;
    let category = create_category(&pool, "Soie").await;
    let scarf = create_product(&pool, &category, "Écharpe", Decimal::new(30_000, 0), 1_000).await;
    let shawl = create_product(&pool, &category, "Lamba mena", Decimal::new(90_000, 0), 1_000).await;

    let carts = CartRepository::new(&pool);
    let first = carts
        .get_or_create(&CartOwner::Session("scarf-first".to_string()))
        .await
        .unwrap();
    let second = carts
        .get_or_create(&CartOwner::Session("shawl-first".to_string()))
        .await
        .unwrap();
    let checkout = CheckoutService::new(&pool, TaxRate::default());
    let shipping = shipping_details();

    for _ in 0..ROUNDS {
        carts.add_item(first, scarf.id, &Size::one_size(), 1).await.unwrap();
        carts.add_item(first, shawl.id, &Size::one_size(), 1).await.unwrap();
        carts.add_item(second, shawl.id, &Size::one_size(), 1).await.unwrap();
        carts.add_item(second, scarf.id, &Size::one_size(), 1).await.unwrap();

        let (a, b) = tokio::join!(
            checkout.place_order(first, None, &shipping, None),
            checkout.place_order(second, None, &shipping, None),
        );
        a.unwrap();
        b.unwrap();
    }

    assert_eq!(reload(&pool, &scarf).await.stock, 1_000 - 2 * ROUNDS);
    assert_eq!(reload(&pool, &shawl).await.stock, 1_000 - 2 * ROUNDS);
    assert_eq!(order_count(&pool).await, i64::from(2 * ROUNDS));
}
