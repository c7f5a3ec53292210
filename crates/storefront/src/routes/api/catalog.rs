//! Catalog endpoints of the JSON API.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tsitsi_core::pagination::Page;
use tsitsi_core::{CategoryId, ProductId};

use crate::db::{CatalogRepository, ReviewRepository};
use crate::error::{AppError, JsonError};
use crate::models::catalog::{CategoryWithCount, Product, ProductFilter, ProductSort};
use crate::models::review::{RatingSummary, Review};
use crate::routes::store::PRODUCTS_PER_PAGE;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, JsonError>;

/// `/api/products` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    /// Category slug.
    pub category: Option<String>,
    pub keyword: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

/// `/api/reviews` query parameters.
#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub product_id: Option<ProductId>,
}

/// A product as exposed to API clients.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub price_display: String,
    pub category_id: CategoryId,
    pub category: String,
    pub image: String,
    pub in_stock: bool,
    pub stock: i32,
    pub url: String,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            price_display: product.unit_price().display(),
            in_stock: product.in_stock(),
            url: product.url(),
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            category_id: product.category_id,
            category: product.category_name,
            image: product.image,
            stock: product.stock,
        }
    }
}

/// One page of products.
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<ProductView>,
    pub page: Page,
}

/// A category with its available product count.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub product_count: i64,
    pub url: String,
}

impl From<CategoryWithCount> for CategoryView {
    fn from(entry: CategoryWithCount) -> Self {
        let url = entry.category.url();
        Self {
            id: entry.category.id,
            name: entry.category.name,
            slug: entry.category.slug,
            description: entry.category.description,
            product_count: entry.product_count,
            url,
        }
    }
}

/// Active reviews of a product with their average.
#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub product_id: ProductId,
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

/// Available products, paginated like the store listing.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> ApiResult<ProductList> {
    let catalog = CatalogRepository::new(state.pool());

    let category_id = match query.category.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => Some(
            catalog
                .get_category_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?
                .id,
        ),
        _ => None,
    };
    let filter = ProductFilter {
        category_id,
        keyword: query
            .keyword
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty()),
    };
    let sort = ProductSort::parse(query.sort.as_deref(), ProductSort::default());

    let total = catalog.count_available(&filter).await?;
    let page = Page::resolve(query.page.as_deref(), PRODUCTS_PER_PAGE, total);
    let products = catalog.list_available(&filter, sort, &page).await?;

    Ok(Json(ProductList {
        products: products.into_iter().map(ProductView::from).collect(),
        page,
    }))
}

/// One available product.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<ProductView> {
    let product = CatalogRepository::new(state.pool())
        .get_product(id)
        .await?
        .filter(|p| p.is_available)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(product.into()))
}

/// All categories with product counts.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryView>> {
    let categories = CatalogRepository::new(state.pool())
        .categories_with_counts()
        .await?;

    Ok(Json(categories.into_iter().map(CategoryView::from).collect()))
}

/// Active reviews of one product.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> ApiResult<ReviewList> {
    let product_id = query
        .product_id
        .ok_or_else(|| AppError::BadRequest("product_id is required".to_owned()))?;

    let reviews = ReviewRepository::new(state.pool());
    let summary = reviews.summary(product_id).await?;
    let list = reviews.list_active(product_id).await?;

    Ok(Json(ReviewList {
        product_id,
        summary,
        reviews: list,
    }))
}
