//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Home page
//!
//! # Catalog
//! GET  /store                              - All products (?page=&sort=)
//! GET  /store/categories                   - Category index with counts
//! GET  /store/search                       - Keyword search (?keyword=)
//! GET  /store/category/{slug}              - Products in a category
//! GET  /store/category/{cslug}/{pslug}     - Product detail
//! POST /store/products/{id}/review         - Create or update a review (multipart)
//!
//! # Cart
//! GET  /cart                               - Cart page
//! POST /cart/add/{product_id}              - Add to cart (JSON for AJAX callers)
//! POST /cart/items/{item_id}/increment     - One more unit
//! POST /cart/items/{item_id}/decrement     - One fewer unit
//! POST /cart/items/{item_id}/remove        - Drop the line
//!
//! # Orders
//! GET  /orders/checkout                    - Shipping form
//! POST /orders/checkout                    - Place the order
//! GET  /orders/complete/{order_number}     - Confirmation page
//! GET  /orders                             - Order history (auth)
//! GET  /orders/{order_number}              - Order detail (auth, owner only)
//!
//! # Users
//! GET  /users/register                     - Registration page
//! POST /users/register                     - Registration action (rate limited)
//! GET  /users/login                        - Login page
//! POST /users/login                        - Login action (rate limited)
//! POST /users/logout                       - Logout action
//! GET  /users/account                      - Account overview (auth)
//! GET  /users/account/edit                 - Profile form (auth)
//! POST /users/account/edit                 - Profile update (auth, multipart)
//!
//! # Pages
//! GET  /contact                            - Contact form
//! POST /contact                            - Send a message (rate limited)
//! GET  /about                              - About page
//!
//! # Dashboard (staff)
//! GET  /dashboard                          - KPIs and period report (?period=&month=)
//! GET  /dashboard/api/sales                - Sales series JSON
//! GET  /dashboard/low-stock                - Low-stock report
//! POST /dashboard/stock/{id}               - Set stock (JSON)
//! GET  /dashboard/products                 - Product management
//! POST /dashboard/products/{id}            - Inline product edit (JSON)
//! POST /dashboard/products/{id}/delete     - Delete a product (JSON)
//! GET  /dashboard/orders                   - Order management (?status=)
//! POST /dashboard/orders/{id}/status       - Change an order's status
//!
//! # JSON API
//! GET  /api/products                       - Available products
//! GET  /api/products/{id}                  - One product
//! GET  /api/categories                     - Categories with counts
//! GET  /api/reviews?product_id=            - Active reviews of a product
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod contact;
pub mod dashboard;
pub mod home;
mod multipart;
pub mod orders;
pub mod reviews;
pub mod store;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::{form_rate_limiter, login_rate_limiter};
use crate::models::review::MAX_IMAGES_PER_REVIEW;
use crate::services::media::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for the text fields of a multipart form.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Body limit for a form carrying `files` uploads.
const fn upload_body_limit(files: usize) -> usize {
    files * MAX_UPLOAD_BYTES + FORM_OVERHEAD_BYTES
}

/// Capitalize the first letter of an error message for display.
pub(crate) fn sentence_case(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Create the catalog routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(store::index))
        .route("/categories", get(store::categories))
        .route("/search", get(store::search))
        .route("/category/{slug}", get(store::category))
        .route(
            "/category/{category_slug}/{product_slug}",
            get(store::product_detail),
        )
        .route(
            "/products/{id}/review",
            post(reviews::submit)
                .layer(DefaultBodyLimit::max(upload_body_limit(MAX_IMAGES_PER_REVIEW))),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{product_id}", post(cart::add))
        .route("/items/{item_id}/increment", post(cart::increment))
        .route("/items/{item_id}/decrement", post(cart::decrement))
        .route("/items/{item_id}/remove", post(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::my_orders))
        .route(
            "/checkout",
            get(orders::checkout_page).post(orders::place_order),
        )
        .route("/complete/{order_number}", get(orders::complete))
        .route("/{order_number}", get(orders::order_detail))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(login_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(login_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
        .route("/account", get(account::index))
        .route(
            "/account/edit",
            get(account::edit_page).merge(
                post(account::edit).layer(DefaultBodyLimit::max(upload_body_limit(1))),
            ),
        )
}

/// Create the staff dashboard router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/api/sales", get(dashboard::sales_api))
        .route("/low-stock", get(dashboard::low_stock))
        .route("/stock/{id}", post(dashboard::update_stock))
        .route("/products", get(dashboard::products))
        .route("/products/{id}", post(dashboard::update_product))
        .route("/products/{id}/delete", post(dashboard::delete_product))
        .route("/orders", get(dashboard::orders))
        .route("/orders/{id}/status", post(dashboard::update_order_status))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/store", store_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/users", user_routes())
        .route(
            "/contact",
            get(contact::contact_page)
                .merge(post(contact::submit_contact).layer(form_rate_limiter())),
        )
        .route("/about", get(contact::about))
        .nest("/dashboard", dashboard_routes())
        .nest("/api", api::routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_case() {
        assert_eq!(
            sentence_case("insufficient stock for Lamba hoany"),
            "Insufficient stock for Lamba hoany"
        );
        assert_eq!(sentence_case("été"), "Été");
        assert_eq!(sentence_case(""), "");
    }

    #[test]
    fn test_upload_limit_covers_every_file() {
        assert!(upload_body_limit(MAX_IMAGES_PER_REVIEW) > MAX_IMAGES_PER_REVIEW * MAX_UPLOAD_BYTES);
    }
}
