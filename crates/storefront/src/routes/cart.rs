//! Cart route handlers.
//!
//! Adding to the cart works as a plain form post (redirect to the cart) or,
//! from script, as an AJAX call answered with the refreshed summary
//! fragment and the new item count. The cart page uses plain form posts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use tsitsi_core::pricing::TaxRate;
use tsitsi_core::{CartItemId, ProductId, Size};

use crate::db::{CartRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::cart::{self, CartContents, DecrementOutcome, IncrementOutcome};
use crate::models::flash::{self, Level};
use crate::state::AppState;

/// Most units of one line that a single add may request.
const MAX_ADD_QUANTITY: i32 = 99;

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub cart: CartContents,
    pub tax_rate: TaxRate,
}

/// Cart summary fragment, shown in the cart page sidebar and returned to
/// AJAX adds.
#[derive(Template)]
#[template(path = "partials/cart_summary.html")]
pub struct CartSummaryPartial<'a> {
    pub cart: &'a CartContents,
    pub tax_rate: TaxRate,
}

/// Add to cart form data.
#[derive(Debug, Default, Deserialize)]
pub struct AddToCartForm {
    pub size: Option<String>,
    pub quantity: Option<String>,
}

impl AddToCartForm {
    /// Requested quantity: at least 1, unparsable values count as 1.
    fn quantity(&self) -> i32 {
        self.quantity
            .as_deref()
            .and_then(|q| q.trim().parse::<i32>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_ADD_QUANTITY)
    }
}

/// Response to an AJAX add.
#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub html: String,
    pub count: i64,
}

/// Whether the request came from script and wants JSON back.
fn is_ajax(headers: &HeaderMap) -> bool {
    let requested_with = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    requested_with || accepts_json
}

/// Display the cart page.
#[instrument(skip(state, ctx, session))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
) -> Result<impl IntoResponse> {
    let tax_rate = state.config().tax_rate;
    let cart = match cart::current_owner(&session, ctx.user.as_ref()).await {
        Some(owner) => {
            CartRepository::new(state.pool())
                .contents(&owner, tax_rate)
                .await?
        }
        None => CartContents::empty(),
    };

    Ok(CartTemplate {
        ctx,
        cart,
        tax_rate,
    })
}

/// Add a product to the cart.
///
/// Repeated adds of the same product and size grow one line.
#[instrument(skip(state, session, user, headers, form), fields(product_id = %product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let owner = cart::ensure_owner(&session, user.as_ref()).await?;
    let repo = CartRepository::new(state.pool());
    let cart_id = repo.get_or_create(&owner).await?;

    let size = Size::normalize(form.size.as_deref());
    let quantity = form.quantity();
    repo.add_item(cart_id, product_id, &size, quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("product {product_id}")),
            other => other.into(),
        })?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );

    if is_ajax(&headers) {
        let tax_rate = state.config().tax_rate;
        let contents = repo.contents(&owner, tax_rate).await?;
        let html = CartSummaryPartial {
            cart: &contents,
            tax_rate,
        }
        .render()?;
        return Ok(Json(AddToCartResponse {
            html,
            count: contents.totals.item_count,
        })
        .into_response());
    }

    flash::push(&session, Level::Success, "Added to your cart.").await;
    Ok(Redirect::to("/cart").into_response())
}

/// Line operations from the cart page.
#[derive(Debug, Clone, Copy)]
enum LineAction {
    Increment,
    Decrement,
    Remove,
}

async fn apply_line_action(
    state: &AppState,
    session: &Session,
    user: Option<&crate::models::CurrentUser>,
    item_id: CartItemId,
    action: LineAction,
) -> Result<Redirect> {
    let repo = CartRepository::new(state.pool());
    let cart_id = match cart::current_owner(session, user).await {
        Some(owner) => repo.find(&owner).await?,
        None => None,
    };
    let Some(cart_id) = cart_id else {
        return Ok(Redirect::to("/cart"));
    };

    let result = match action {
        LineAction::Increment => repo.increment(cart_id, item_id).await.map(|outcome| {
            (outcome == IncrementOutcome::AtStockLimit)
                .then_some((Level::Warning, "No more units of this item are in stock."))
        }),
        LineAction::Decrement => repo.decrement(cart_id, item_id).await.map(|outcome| {
            (outcome == DecrementOutcome::Removed)
                .then_some((Level::Info, "The item was removed from your cart."))
        }),
        LineAction::Remove => repo
            .remove(cart_id, item_id)
            .await
            .map(|()| Some((Level::Info, "The item was removed from your cart."))),
    };

    match result {
        Ok(Some((level, message))) => flash::push(session, level, message).await,
        Ok(None) => {}
        // The line is already gone (double submit, other tab).
        Err(RepositoryError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/cart"))
}

/// Add one unit to a line, up to the product's stock.
#[instrument(skip(state, session, user))]
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Redirect> {
    apply_line_action(&state, &session, user.as_ref(), item_id, LineAction::Increment).await
}

/// Take one unit off a line; a line with one unit is removed.
#[instrument(skip(state, session, user))]
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Redirect> {
    apply_line_action(&state, &session, user.as_ref(), item_id, LineAction::Decrement).await
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Redirect> {
    apply_line_action(&state, &session, user.as_ref(), item_id, LineAction::Remove).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_is_ajax() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));

        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(is_ajax(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain"),
        );
        assert!(is_ajax(&headers));
    }

    #[test]
    fn test_add_quantity_defaults_and_clamps() {
        let form = |q: Option<&str>| AddToCartForm {
            size: None,
            quantity: q.map(str::to_owned),
        };
        assert_eq!(form(None).quantity(), 1);
        assert_eq!(form(Some("3")).quantity(), 3);
        assert_eq!(form(Some("0")).quantity(), 1);
        assert_eq!(form(Some("-4")).quantity(), 1);
        assert_eq!(form(Some("lots")).quantity(), 1);
        assert_eq!(form(Some("500")).quantity(), MAX_ADD_QUANTITY);
    }
}
