//! Read-only JSON API.
//!
//! Errors are answered as `{"error": message}` through [`JsonError`].
//!
//! [`JsonError`]: crate::error::JsonError

mod catalog;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the `/api` router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/categories", get(catalog::categories))
        .route("/reviews", get(catalog::reviews))
}
