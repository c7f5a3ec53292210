//! Database operations for the storefront `PostgreSQL` schema.
//!
//! ## Tables (schema `storefront`)
//!
//! - `user`, `user_password`, `user_profile` - Accounts
//! - `category`, `product`, `product_image` - Catalog
//! - `cart`, `cart_item` - Session- or user-owned carts
//! - `customer_order`, `order_item` - Placed orders with price snapshots
//! - `review`, `review_image` - One review per user and product
//! - `about_page` - About page content
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tsitsi-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

pub mod about;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod reports;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use about::AboutRepository;
pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use reports::ReportRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict(message)`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url.expose_secret())
        .await
}
