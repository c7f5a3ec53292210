//! Integration tests for cart persistence.
//!
//! Requires a `PostgreSQL` server reachable through `DATABASE_URL`.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use tsitsi_core::{Size, pricing::TaxRate};
use tsitsi_integration_tests::{create_category, create_product, create_user};
use tsitsi_storefront::db::CartRepository;
use tsitsi_storefront::models::cart::{CartOwner, DecrementOutcome, IncrementOutcome};

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_repeated_adds_merge_into_one_line(pool: PgPool) {
    let category = create_category(&pool, "Lamba").await;
    let shawl = create_product(&pool, &category, "Lamba hoany", Decimal::new(12_000, 0), 20).await;

    let carts = CartRepository::new(&pool);
    let owner = CartOwner::Session("merge-lines".to_string());
    let cart_id = carts.get_or_create(&owner).await.unwrap();
    carts.add_item(cart_id, shawl.id, &Size::normalize(None), 1).await.unwrap();
    carts
        .add_item(cart_id, shawl.id, &Size::normalize(Some("Select")), 2)
        .await
        .unwrap();

    let contents = carts.contents(&owner, TaxRate::default()).await.unwrap();
    assert_eq!(contents.lines.len(), 1);
    assert_eq!(contents.lines[0].quantity, 3);
    assert_eq!(contents.lines[0].line_total, Decimal::new(36_000, 0));
    assert_eq!(contents.totals.item_count, 3);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_different_sizes_stay_separate(pool: PgPool) {
    let category = create_category(&pool, "Akanjo").await;
    let shirt = create_product(&pool, &category, "Chemise", Decimal::new(25_000, 0), 20).await;

    let carts = CartRepository::new(&pool);
    let owner = CartOwner::Session("sizes".to_string());
    let cart_id = carts.get_or_create(&owner).await.unwrap();
    carts.add_item(cart_id, shirt.id, &Size::normalize(Some("M")), 1).await.unwrap();
    carts.add_item(cart_id, shirt.id, &Size::normalize(Some("L")), 1).await.unwrap();

    assert_eq!(carts.lines(cart_id).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_increment_stops_at_stock(pool: PgPool) {
    let category = create_category(&pool, "Vannerie").await;
    let basket = create_product(&pool, &category, "Sobika", Decimal::new(4_500, 0), 2).await;

    let carts = CartRepository::new(&pool);
    let cart_id = carts
        .get_or_create(&CartOwner::Session("increment".to_string()))
        .await
        .unwrap();
    carts.add_item(cart_id, basket.id, &Size::one_size(), 1).await.unwrap();
    let line = carts.lines(cart_id).await.unwrap().remove(0);

    assert_eq!(
        carts.increment(cart_id, line.id).await.unwrap(),
        IncrementOutcome::Incremented
    );
    assert_eq!(
        carts.increment(cart_id, line.id).await.unwrap(),
        IncrementOutcome::AtStockLimit
    );
    assert_eq!(carts.lines(cart_id).await.unwrap()[0].quantity, 2);

    assert_eq!(
        carts.decrement(cart_id, line.id).await.unwrap(),
        DecrementOutcome::Decremented
    );
    assert_eq!(
        carts.decrement(cart_id, line.id).await.unwrap(),
        DecrementOutcome::Removed
    );
    assert!(carts.lines(cart_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_guest_cart_moves_to_user_on_login(pool: PgPool) {
    let category = create_category(&pool, "Lamba").await;
    let shawl = create_product(&pool, &category, "Lamba hoany", Decimal::new(12_000, 0), 20).await;
    let user_id = create_user(&pool, "hery").await;

    let carts = CartRepository::new(&pool);
    let user_owner = CartOwner::User(user_id);
    let user_cart = carts.get_or_create(&user_owner).await.unwrap();
    carts.add_item(user_cart, shawl.id, &Size::one_size(), 1).await.unwrap();

    let guest = CartOwner::Session("guest-key".to_string());
    let guest_cart = carts.get_or_create(&guest).await.unwrap();
    carts.add_item(guest_cart, shawl.id, &Size::one_size(), 2).await.unwrap();

    carts.merge_into_user("guest-key", user_id).await.unwrap();

    assert_eq!(carts.find(&guest).await.unwrap(), None);
    let contents = carts.contents(&user_owner, TaxRate::default()).await.unwrap();
    assert_eq!(contents.lines.len(), 1);
    assert_eq!(contents.lines[0].quantity, 3);
}
