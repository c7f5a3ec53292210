//! Integration tests for Tsitsi Store.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and point DATABASE_URL at it
//! task db:start
//!
//! # Run the ignored database and HTTP tests
//! cargo test -p tsitsi-integration-tests -- --ignored
//! ```
//!
//! Database tests use `#[sqlx::test]`, which creates a scratch database per
//! test and applies the storefront migrations. HTTP smoke tests talk to a
//! running storefront at `STOREFRONT_BASE_URL`.
//!
//! # Test Categories
//!
//! - `checkout` - Order placement, totals and stock reservation
//! - `cart` - Line merging and guest-to-user hand-over
//! - `reviews` - One review per user and product
//! - `reports` - Dashboard revenue figures
//! - `http` - Smoke tests against a live server

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use tsitsi_core::{Email, UserId};
use tsitsi_storefront::db::catalog::NewProduct;
use tsitsi_storefront::db::{CatalogRepository, UserRepository};
use tsitsi_storefront::models::catalog::{Category, Product};
use tsitsi_storefront::models::order::ShippingDetails;
use tsitsi_storefront::models::user::NewUser;

/// Base URL of a running storefront.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Create a category for the test to hang products on.
pub async fn create_category(pool: &PgPool, name: &str) -> Category {
    let slug = tsitsi_core::slug::slugify(name);
    CatalogRepository::new(pool)
        .create_category(name, &slug, "")
        .await
        .unwrap()
}

/// Create an available product with the given price and stock.
pub async fn create_product(
    pool: &PgPool,
    category: &Category,
    name: &str,
    price: Decimal,
    stock: i32,
) -> Product {
    CatalogRepository::new(pool)
        .create_product(&NewProduct {
            category_id: category.id,
            name: name.to_string(),
            slug: tsitsi_core::slug::slugify(name),
            description: format!("{name} for tests"),
            price,
            image: String::new(),
            stock,
            reorder_point: 2,
            is_available: true,
        })
        .await
        .unwrap()
}

/// Reload a product to see its current stock.
pub async fn reload(pool: &PgPool, product: &Product) -> Product {
    CatalogRepository::new(pool)
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap()
}

/// Create a customer account. The password hash is never checked here.
pub async fn create_user(pool: &PgPool, username: &str) -> UserId {
    let user = UserRepository::new(pool)
        .create_with_password(
            &NewUser {
                username: username.to_string(),
                email: Email::parse(&format!("{username}@example.mg")).unwrap(),
                first_name: "Test".to_string(),
                last_name: "Shopper".to_string(),
                phone_number: None,
                is_staff: false,
            },
            "$argon2id$v=19$m=19456,t=2,p=1$unused$unused",
        )
        .await
        .unwrap();
    user.id
}

/// A complete shipping address.
#[must_use]
pub fn shipping_details() -> ShippingDetails {
    ShippingDetails {
        first_name: "Hery".to_string(),
        last_name: "Rakoto".to_string(),
        phone: "+261 34 00 000 00".to_string(),
        email: Email::parse("hery@example.mg").unwrap(),
        address_line_1: "Lot II A 12".to_string(),
        address_line_2: String::new(),
        city: "Antananarivo".to_string(),
        state: String::new(),
        country: "Madagascar".to_string(),
        order_note: String::new(),
    }
}
