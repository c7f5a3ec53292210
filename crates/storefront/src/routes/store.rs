//! Catalog route handlers: listings, categories, search and product pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tsitsi_core::pagination::Page;
use tsitsi_core::{Rating, Size};

use crate::db::{CartRepository, CatalogRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::cart;
use crate::models::catalog::{
    Category, CategoryWithCount, Product, ProductFilter, ProductImage, ProductSort,
};
use crate::models::review::{MAX_IMAGES_PER_REVIEW, MAX_REVIEW_CHARS, RatingSummary, Review};
use crate::state::AppState;

/// Products per catalog page.
pub const PRODUCTS_PER_PAGE: u32 = 12;

/// Sort choices offered above every listing.
pub const SORT_OPTIONS: [(&str, &str); 4] = [
    ("name", "Name"),
    ("latest", "Newest"),
    ("price_asc", "Price: low to high"),
    ("price_desc", "Price: high to low"),
];

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<String>,
    pub sort: Option<String>,
}

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
}

/// Product listing template, shared by the store, category and search pages.
#[derive(Template, WebTemplate)]
#[template(path = "store/listing.html")]
pub struct ListingTemplate {
    pub ctx: PageContext,
    pub heading: String,
    pub category: Option<Category>,
    pub keyword: Option<String>,
    pub products: Vec<Product>,
    pub page: Page,
    pub sort: &'static str,
    pub sort_options: [(&'static str, &'static str); 4],
    /// Path and query up to (not including) `page=`, e.g. `/store?sort=name&`.
    pub page_link_prefix: String,
    /// Path the sort form submits to.
    pub form_action: String,
}

impl ListingTemplate {
    /// Whether `key` is the active sort order.
    #[must_use]
    pub fn is_sort(&self, key: &str) -> bool {
        self.sort == key
    }
}

/// Category index template.
#[derive(Template, WebTemplate)]
#[template(path = "store/categories.html")]
pub struct CategoriesTemplate {
    pub ctx: PageContext,
    pub categories: Vec<CategoryWithCount>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "store/product.html")]
pub struct ProductTemplate {
    pub ctx: PageContext,
    pub product: Product,
    pub gallery: Vec<ProductImage>,
    pub in_cart: bool,
    pub rating: RatingSummary,
    pub times_purchased: i64,
    pub reviews: Vec<Review>,
    /// The viewer's own review, used to prefill the form.
    pub own_review: Option<Review>,
    pub rating_choices: Vec<i16>,
    pub sizes: Vec<&'static str>,
    pub max_review_chars: usize,
    pub max_review_images: usize,
}

impl ProductTemplate {
    /// Rating preselected in the review form.
    #[must_use]
    pub fn selected_rating(&self) -> i16 {
        self.own_review
            .as_ref()
            .map_or(Rating::MAX, |r| r.rating.value())
    }

    /// Whether `value` is the preselected rating.
    #[must_use]
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn is_selected_rating(&self, value: &i16) -> bool {
        *value == self.selected_rating()
    }

    /// Text prefilled in the review form.
    #[must_use]
    pub fn own_review_text(&self) -> &str {
        self.own_review.as_ref().map_or("", |r| r.review.as_str())
    }
}

/// Build the filter-and-sort part of a listing link.
fn page_link_prefix(path: &str, keyword: Option<&str>, sort: ProductSort) -> String {
    let mut link = format!("{path}?");
    if let Some(keyword) = keyword {
        link.push_str("keyword=");
        link.push_str(&urlencoding::encode(keyword));
        link.push('&');
    }
    link.push_str("sort=");
    link.push_str(sort.key());
    link.push('&');
    link
}

struct Listing<'q> {
    heading: String,
    path: String,
    category: Option<Category>,
    keyword: Option<&'q str>,
    sort: ProductSort,
    page: Option<&'q str>,
}

async fn render_listing(
    state: &AppState,
    ctx: PageContext,
    listing: Listing<'_>,
) -> Result<ListingTemplate> {
    let repo = CatalogRepository::new(state.pool());
    let filter = ProductFilter {
        category_id: listing.category.as_ref().map(|c| c.id),
        keyword: listing.keyword.map(str::to_owned),
    };

    let total = repo.count_available(&filter).await?;
    let page = Page::resolve(listing.page, PRODUCTS_PER_PAGE, total);
    let products = repo.list_available(&filter, listing.sort, &page).await?;

    Ok(ListingTemplate {
        ctx,
        heading: listing.heading,
        page_link_prefix: page_link_prefix(&listing.path, listing.keyword, listing.sort),
        form_action: listing.path,
        category: listing.category,
        keyword: listing.keyword.map(str::to_owned),
        products,
        page,
        sort: listing.sort.key(),
        sort_options: SORT_OPTIONS,
    })
}

/// All available products.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    render_listing(
        &state,
        ctx,
        Listing {
            heading: "All products".to_owned(),
            path: "/store".to_owned(),
            category: None,
            keyword: None,
            sort: ProductSort::parse(query.sort.as_deref(), ProductSort::Name),
            page: query.page.as_deref(),
        },
    )
    .await
}

/// Available products in one category.
#[instrument(skip(state, ctx))]
pub async fn category(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let category = CatalogRepository::new(state.pool())
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;

    render_listing(
        &state,
        ctx,
        Listing {
            heading: category.name.clone(),
            path: category.url(),
            category: Some(category),
            keyword: None,
            sort: ProductSort::parse(query.sort.as_deref(), ProductSort::Name),
            page: query.page.as_deref(),
        },
    )
    .await
}

/// Categories with their product counts.
#[instrument(skip(state, ctx))]
pub async fn categories(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let categories = CatalogRepository::new(state.pool())
        .categories_with_counts()
        .await?;
    Ok(CategoriesTemplate { ctx, categories })
}

/// Keyword search over product names and descriptions.
///
/// An empty keyword goes back to the full listing.
#[instrument(skip(state, ctx))]
pub async fn search(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<Response> {
    let keyword = query.keyword.as_deref().map(str::trim).unwrap_or_default();
    if keyword.is_empty() {
        return Ok(Redirect::to("/store").into_response());
    }

    let template = render_listing(
        &state,
        ctx,
        Listing {
            heading: format!("Results for \u{201c}{keyword}\u{201d}"),
            path: "/store/search".to_owned(),
            category: None,
            keyword: Some(keyword),
            sort: ProductSort::parse(query.sort.as_deref(), ProductSort::Latest),
            page: query.page.as_deref(),
        },
    )
    .await?;

    Ok(template.into_response())
}

/// Product detail page.
#[instrument(skip(state, ctx, session))]
pub async fn product_detail(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Path((category_slug, product_slug)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let catalog = CatalogRepository::new(state.pool());
    let product = catalog
        .get_by_slugs(&category_slug, &product_slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {category_slug}/{product_slug}")))?;

    let reviews_repo = ReviewRepository::new(state.pool());
    let gallery = catalog.gallery(product.id).await?;
    let times_purchased = catalog.times_purchased(product.id).await?;
    let rating = reviews_repo.summary(product.id).await?;
    let reviews = reviews_repo.list_active(product.id).await?;

    let own_review = match &ctx.user {
        Some(user) => reviews_repo.get_for_user(user.id, product.id).await?,
        None => None,
    };

    let in_cart = match cart::current_owner(&session, ctx.user.as_ref()).await {
        Some(owner) => CartRepository::new(state.pool())
            .contents(&owner, state.config().tax_rate)
            .await?
            .contains(product.id),
        None => false,
    };

    Ok(ProductTemplate {
        ctx,
        product,
        gallery,
        in_cart,
        rating,
        times_purchased,
        reviews,
        own_review,
        rating_choices: (Rating::MIN..=Rating::MAX).rev().collect(),
        sizes: vec![Size::ONE_SIZE, "S", "M", "L", "XL"],
        max_review_chars: MAX_REVIEW_CHARS,
        max_review_images: MAX_IMAGES_PER_REVIEW,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link_prefix_plain_listing() {
        assert_eq!(
            page_link_prefix("/store", None, ProductSort::PriceAsc),
            "/store?sort=price_asc&"
        );
    }

    #[test]
    fn test_page_link_prefix_encodes_keyword() {
        assert_eq!(
            page_link_prefix("/store/search", Some("lamba & co"), ProductSort::Latest),
            "/store/search?keyword=lamba%20%26%20co&sort=latest&"
        );
    }
}
