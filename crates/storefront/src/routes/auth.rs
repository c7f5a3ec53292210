//! Registration, login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::CartRepository;
use super::sentence_case;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{PageContext, clear_current_user, is_local_path, set_current_user};
use crate::models::flash::{self, Level};
use crate::models::user::User;
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH, Registration};
use crate::state::AppState;

/// Where users land after logging in without a `next` target.
const DEFAULT_LANDING: &str = "/users/account";

// =============================================================================
// Form Types
// =============================================================================

/// `?next=` on the login and register pages.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Email address or username.
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub identifier: String,
    pub next: String,
    pub error: Option<String>,
}

/// Register page template. Passwords are never echoed back.
#[derive(Template, WebTemplate)]
#[template(path = "users/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub form: RegisterForm,
    pub error: Option<String>,
    pub min_password_length: usize,
}

/// A `next` target that is safe to redirect to.
fn safe_next(next: Option<&str>) -> String {
    next.map(str::trim)
        .filter(|n| is_local_path(n))
        .unwrap_or(DEFAULT_LANDING)
        .to_owned()
}

/// Put the user in the session and move any guest cart into theirs.
async fn start_session(state: &AppState, session: &Session, user: &User) -> Result<()> {
    let guest_cart_key = session
        .remove::<String>(session_keys::CART_KEY)
        .await
        .ok()
        .flatten();

    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, &user.username);

    if let Some(key) = guest_cart_key
        && let Err(e) = CartRepository::new(state.pool())
            .merge_into_user(&key, user.id)
            .await
    {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to merge guest cart");
    }

    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(ctx: PageContext, Query(query): Query<NextQuery>) -> impl IntoResponse {
    LoginTemplate {
        ctx,
        identifier: String::new(),
        next: safe_next(query.next.as_deref()),
        error: None,
    }
}

/// Handle login form submission.
#[instrument(skip(state, ctx, session, form), fields(identifier = %form.identifier))]
pub async fn login(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref());

    let user = match AuthService::new(state.pool())
        .login(&form.identifier, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) if e.is_user_facing() => {
            tracing::info!("Login failed");
            let page = LoginTemplate {
                ctx,
                identifier: form.identifier,
                next,
                error: Some("Invalid credentials.".to_string()),
            };
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&state, &session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    flash::push(&session, Level::Success, "You are now logged in.").await;

    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(ctx: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        ctx,
        form: RegisterForm::default(),
        error: None,
        min_password_length: MIN_PASSWORD_LENGTH,
    }
}

/// Handle registration. The new user is logged in straight away.
#[instrument(skip(state, ctx, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let registration = Registration {
        first_name: &form.first_name,
        last_name: &form.last_name,
        phone_number: &form.phone_number,
        email: &form.email,
        username: &form.username,
        password: &form.password,
        confirm_password: &form.confirm_password,
    };

    let user = match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => user,
        Err(e) if e.is_user_facing() => {
            let status = match e {
                AuthError::EmailTaken | AuthError::UsernameTaken => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            let page = RegisterTemplate {
                ctx,
                error: Some(sentence_case(&e.to_string())),
                form: RegisterForm {
                    password: String::new(),
                    confirm_password: String::new(),
                    ..form
                },
                min_password_length: MIN_PASSWORD_LENGTH,
            };
            return Ok((status, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&state, &session, &user).await?;
    tracing::info!(user_id = %user.id, "User registered");
    flash::push(&session, Level::Success, "Your account has been created.").await;

    Ok(Redirect::to(DEFAULT_LANDING).into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and forget the session, guest cart included.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(Some("/orders/checkout")), "/orders/checkout");
        assert_eq!(safe_next(Some("https://evil.example")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("//evil.example/x")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("")), DEFAULT_LANDING);
        assert_eq!(safe_next(None), DEFAULT_LANDING);
    }
}
