//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::models::catalog::Product;
use crate::state::AppState;

/// Number of products shown on the home page.
const HOME_PRODUCT_COUNT: i64 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
}

/// Display the home page with the newest products.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse> {
    let products = CatalogRepository::new(state.pool())
        .newest_available(HOME_PRODUCT_COUNT)
        .await?;

    Ok(HomeTemplate { ctx, products })
}
