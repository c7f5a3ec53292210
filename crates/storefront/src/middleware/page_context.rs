//! Data every rendered page needs: who is logged in, the header cart count,
//! pending flash messages and the category menu.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::db::CartRepository;
use crate::models::catalog::Category;
use crate::models::flash::{self, FlashMessage};
use crate::models::{CurrentUser, cart, session_keys};
use crate::state::AppState;

/// Layout context for full-page templates.
///
/// Extracting it drains the session's flash messages, so only handlers that
/// render a page (not ones that redirect) should take it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub store_name: String,
    pub user: Option<CurrentUser>,
    pub cart_count: i64,
    pub flash: Vec<FlashMessage>,
    pub categories: Arc<Vec<Category>>,
}

impl PageContext {
    /// Whether to show the dashboard link.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_staff)
    }

    /// Greeting name for the header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.user.as_ref().map_or("", CurrentUser::display_name)
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let categories = state
            .content()
            .nav_categories(state.pool())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load category menu");
                Arc::default()
            });

        let mut ctx = Self {
            store_name: state.config().store_name.clone(),
            categories,
            ..Self::default()
        };

        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(ctx);
        };

        ctx.user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        ctx.flash = flash::take(&session).await;

        if let Some(owner) = cart::current_owner(&session, ctx.user.as_ref()).await {
            ctx.cart_count = CartRepository::new(state.pool())
                .item_count(&owner)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to count cart items");
                    0
                });
        }

        Ok(ctx)
    }
}
