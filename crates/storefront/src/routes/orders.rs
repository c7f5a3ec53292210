//! Checkout and order route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use tsitsi_core::OrderNumber;
use tsitsi_core::pricing::TaxRate;

use super::sentence_case;
use crate::db::{CartRepository, OrderRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{ClientIp, PageContext, RequireAuth};
use crate::models::cart::{self, CartContents};
use crate::models::flash::{self, Level};
use crate::models::order::{Order, OrderWithItems};
use crate::models::session_keys;
use crate::services::auth::AuthService;
use crate::services::checkout::{CheckoutError, CheckoutService, ShippingForm};
use crate::state::AppState;

/// Order numbers a session remembers for guest confirmation pages.
const MAX_REMEMBERED_ORDERS: usize = 20;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/checkout.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartContents,
    pub tax_rate: TaxRate,
    pub form: ShippingForm,
    pub errors: Vec<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/complete.html")]
pub struct OrderCompleteTemplate {
    pub ctx: PageContext,
    pub order: OrderWithItems,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrderListTemplate {
    pub ctx: PageContext,
    pub orders: Vec<Order>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/detail.html")]
pub struct OrderDetailTemplate {
    pub ctx: PageContext,
    pub order: OrderWithItems,
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn placed_orders(session: &Session) -> Vec<String> {
    session
        .get::<Vec<String>>(session_keys::PLACED_ORDERS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Remember that this session placed `number`, so a guest can see the
/// confirmation page.
async fn remember_placed_order(session: &Session, number: &OrderNumber) {
    let mut numbers = placed_orders(session).await;
    numbers.push(number.to_string());
    if numbers.len() > MAX_REMEMBERED_ORDERS {
        numbers.drain(..numbers.len() - MAX_REMEMBERED_ORDERS);
    }
    if let Err(e) = session.insert(session_keys::PLACED_ORDERS, &numbers).await {
        tracing::warn!(error = %e, "Failed to remember placed order");
    }
}

/// Look up an order by the number in the URL. Malformed numbers are 404s.
async fn find_order(state: &AppState, raw_number: &str) -> Result<OrderWithItems> {
    let number = OrderNumber::parse(raw_number)
        .ok_or_else(|| AppError::NotFound(format!("order {raw_number}")))?;
    OrderRepository::new(state.pool())
        .get_by_number(&number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {raw_number}")))
}

// =============================================================================
// Checkout
// =============================================================================

/// Display the checkout form, prefilled for logged-in users.
#[instrument(skip(state, ctx, session))]
pub async fn checkout_page(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
) -> Result<Response> {
    let tax_rate = state.config().tax_rate;
    let cart = match cart::current_owner(&session, ctx.user.as_ref()).await {
        Some(owner) => {
            CartRepository::new(state.pool())
                .contents(&owner, tax_rate)
                .await?
        }
        None => CartContents::empty(),
    };

    if cart.is_empty() {
        flash::push(&session, Level::Warning, "Your cart is empty.").await;
        return Ok(Redirect::to("/store").into_response());
    }

    let form = match &ctx.user {
        Some(current) => {
            let user = AuthService::new(state.pool()).get_user(current.id).await?;
            let profile = UserRepository::new(state.pool())
                .get_profile(current.id)
                .await?;
            ShippingForm::prefilled(&user, &profile)
        }
        None => ShippingForm::default(),
    };

    Ok(CheckoutTemplate {
        ctx,
        cart,
        tax_rate,
        form,
        errors: Vec::new(),
    }
    .into_response())
}

/// Place the order.
///
/// Invalid forms are shown again; stock problems go back to the cart with a
/// flash message and leave the cart untouched.
#[instrument(skip(state, ctx, session, ip, form))]
pub async fn place_order(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let tax_rate = state.config().tax_rate;
    let carts = CartRepository::new(state.pool());
    let owner = cart::current_owner(&session, ctx.user.as_ref()).await;
    let cart_id = match &owner {
        Some(owner) => carts.find(owner).await?,
        None => None,
    };
    let Some(cart_id) = cart_id else {
        flash::push(&session, Level::Warning, "Your cart is empty.").await;
        return Ok(Redirect::to("/store").into_response());
    };

    let shipping = match form.validate() {
        Ok(shipping) => shipping,
        Err(errors) => {
            let cart = match &owner {
                Some(owner) => carts.contents(owner, tax_rate).await?,
                None => CartContents::empty(),
            };
            let page = CheckoutTemplate {
                ctx,
                cart,
                tax_rate,
                form,
                errors,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let user_id = ctx.user.as_ref().map(|u| u.id);
    let ip = ip.map(|ip| ip.to_string());
    let placed = match CheckoutService::new(state.pool(), tax_rate)
        .place_order(cart_id, user_id, &shipping, ip.as_deref())
        .await
    {
        Ok(placed) => placed,
        Err(CheckoutError::EmptyCart) => {
            flash::push(&session, Level::Warning, "Your cart is empty.").await;
            return Ok(Redirect::to("/store").into_response());
        }
        Err(
            e @ (CheckoutError::InsufficientStock { .. }
            | CheckoutError::ProductUnavailable { .. }),
        ) => {
            tracing::info!(reason = %e, "Checkout refused");
            flash::push(&session, Level::Error, sentence_case(&e.to_string())).await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    remember_placed_order(&session, &placed.order_number).await;
    add_breadcrumb(
        "checkout",
        "Order placed",
        &[("order_number", placed.order_number.to_string())],
    );

    send_confirmation(&state, &placed.order_number).await;

    Ok(Redirect::to(&format!("/orders/complete/{}", placed.order_number)).into_response())
}

/// Email the confirmation in the background. Failures are logged only.
async fn send_confirmation(state: &AppState, number: &OrderNumber) {
    let Some(email) = state.email().cloned() else {
        tracing::debug!("Email not configured, skipping order confirmation");
        return;
    };

    let order = match OrderRepository::new(state.pool()).get_by_number(number).await {
        Ok(Some(order)) => order,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load order for confirmation email");
            return;
        }
    };

    let store_name = state.config().store_name.clone();
    let order_url = format!("{}/orders/complete/{number}", state.config().base_url);
    tokio::spawn(async move {
        if let Err(e) = email
            .send_order_confirmation(&store_name, &order, &order_url)
            .await
        {
            tracing::warn!(
                order_number = %order.order.order_number,
                error = %e,
                "Failed to send order confirmation"
            );
        }
    });
}

// =============================================================================
// Order Pages
// =============================================================================

/// Confirmation page after checkout.
///
/// Visible to the owning user, or to the session that placed the order.
#[instrument(skip(state, ctx, session))]
pub async fn complete(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse> {
    let order = find_order(&state, &order_number).await?;

    let owned = ctx.user.as_ref().is_some_and(|u| order.is_owned_by(u.id));
    let placed_here = placed_orders(&session)
        .await
        .iter()
        .any(|n| n == order.order.order_number.as_str());
    if !owned && !placed_here {
        return Err(AppError::NotFound(format!("order {order_number}")));
    }

    Ok(OrderCompleteTemplate { ctx, order })
}

/// The logged-in user's orders, newest first.
#[instrument(skip(state, ctx, user))]
pub async fn my_orders(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(OrderListTemplate { ctx, orders })
}

/// One of the user's orders. Other people's orders are 404s.
#[instrument(skip(state, ctx, user))]
pub async fn order_detail(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse> {
    let order = find_order(&state, &order_number).await?;
    if !order.is_owned_by(user.id) {
        return Err(AppError::NotFound(format!("order {order_number}")));
    }
    Ok(OrderDetailTemplate { ctx, order })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use tower_sessions::MemoryStore;
    use tsitsi_core::UserId;

    use super::*;

    #[tokio::test]
    async fn test_session_remembers_recent_orders_only() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let placed_at = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

        let mut last = None;
        for i in 0..(MAX_REMEMBERED_ORDERS + 5) {
            let suffix = format!("A{i:03}");
            let number = OrderNumber::generate(placed_at, Some(UserId::new(1)), &suffix);
            remember_placed_order(&session, &number).await;
            last = Some(number);
        }

        let numbers = placed_orders(&session).await;
        assert_eq!(numbers.len(), MAX_REMEMBERED_ORDERS);
        assert_eq!(numbers.last().map(String::as_str), last.as_ref().map(OrderNumber::as_str));
    }
}
