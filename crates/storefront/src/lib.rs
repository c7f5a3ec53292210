//! Tsitsi Store storefront library.
//!
//! Everything the `tsitsi-storefront` binary serves lives here so the CLI
//! and the integration tests can reuse the repositories and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::State, http::StatusCode, middleware as axum_middleware, routing::get};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Build the complete application router: pages, API, health checks,
/// static files and uploads, wrapped in the request middleware stack.
pub fn build_router(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());
    let static_dir = ServeDir::new(&state.config().static_dir);
    let media_dir = ServeDir::new(&state.config().media_dir);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", static_dir)
        .nest_service("/media", media_dir)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(
                    middleware::security_headers_middleware,
                ))
                .layer(session_layer),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
