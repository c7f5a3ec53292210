//! Account route handlers: overview and profile editing.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use super::multipart::MultipartForm;
use crate::db::{OrderRepository, UserRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::flash::{self, Level};
use crate::models::order::Order;
use crate::models::user::{Profile, ProfileUpdate, User};
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Orders shown on the account overview.
const RECENT_ORDER_COUNT: usize = 5;

/// Longest accepted first or last name.
const MAX_NAME_CHARS: usize = 50;

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "users/account.html")]
pub struct AccountTemplate {
    pub ctx: PageContext,
    pub user: User,
    pub profile: Profile,
    pub recent_orders: Vec<Order>,
    pub order_count: usize,
}

/// Profile form values, as submitted or as stored.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl ProfileForm {
    fn from_account(user: &User, profile: &Profile) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone().unwrap_or_default(),
            address_line_1: profile.address_line_1.clone(),
            address_line_2: profile.address_line_2.clone(),
            city: profile.city.clone(),
            state: profile.state.clone(),
            country: profile.country.clone(),
        }
    }

    fn from_multipart(form: &MultipartForm) -> Self {
        Self {
            first_name: form.text("first_name").to_owned(),
            last_name: form.text("last_name").to_owned(),
            phone_number: form.text("phone_number").to_owned(),
            address_line_1: form.text("address_line_1").to_owned(),
            address_line_2: form.text("address_line_2").to_owned(),
            city: form.text("city").to_owned(),
            state: form.text("state").to_owned(),
            country: form.text("country").to_owned(),
        }
    }

    /// Field errors, empty when the form is acceptable.
    fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (value, label) in [(&self.first_name, "First name"), (&self.last_name, "Last name")] {
            if value.is_empty() {
                errors.push(format!("{label} is required."));
            } else if value.chars().count() > MAX_NAME_CHARS {
                errors.push(format!("{label} must be at most {MAX_NAME_CHARS} characters."));
            }
        }
        errors
    }

    fn into_update(self, profile_picture: Option<String>) -> ProfileUpdate {
        ProfileUpdate {
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: (!self.phone_number.is_empty()).then_some(self.phone_number),
            address_line_1: self.address_line_1,
            address_line_2: self.address_line_2,
            city: self.city,
            state: self.state,
            country: self.country,
            profile_picture,
        }
    }
}

/// Profile edit template.
#[derive(Template, WebTemplate)]
#[template(path = "users/edit_profile.html")]
pub struct EditProfileTemplate {
    pub ctx: PageContext,
    pub form: ProfileForm,
    pub profile_picture: Option<String>,
    pub errors: Vec<String>,
}

/// Display the account overview.
#[instrument(skip(state, ctx, current))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    let profile = UserRepository::new(state.pool())
        .get_profile(current.id)
        .await?;
    let mut recent_orders = OrderRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;
    let order_count = recent_orders.len();
    recent_orders.truncate(RECENT_ORDER_COUNT);

    Ok(AccountTemplate {
        ctx,
        user,
        profile,
        recent_orders,
        order_count,
    })
}

/// Display the profile form.
#[instrument(skip(state, ctx, current))]
pub async fn edit_page(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    let profile = UserRepository::new(state.pool())
        .get_profile(current.id)
        .await?;

    Ok(EditProfileTemplate {
        ctx,
        form: ProfileForm::from_account(&user, &profile),
        profile_picture: profile.profile_picture,
        errors: Vec::new(),
    })
}

/// Save the profile, with an optional new picture.
#[instrument(skip(state, ctx, session, current, multipart))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    RequireAuth(current): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let submitted = MultipartForm::read(multipart).await?;
    let form = ProfileForm::from_multipart(&submitted);
    let users = UserRepository::new(state.pool());

    let mut errors = form.errors();
    let mut picture = None;
    if let Some(bytes) = submitted.files("profile_picture").next() {
        match state
            .media()
            .save_image("userprofile", Utc::now().date_naive(), bytes)
            .await
        {
            Ok(path) => picture = Some(path),
            Err(e @ crate::services::media::UploadError::Io(_)) => return Err(e.into()),
            Err(e) => errors.push(format!("Profile picture: {e}.")),
        }
    }

    if !errors.is_empty() {
        let profile = users.get_profile(current.id).await?;
        let page = EditProfileTemplate {
            ctx,
            form,
            profile_picture: profile.profile_picture,
            errors,
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    users
        .update_profile(current.id, &form.into_update(picture))
        .await?;

    // Keep the header greeting in step with the new name.
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    if let Err(e) = session
        .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
        .await
    {
        tracing::warn!(error = %e, "Failed to refresh session user");
    }

    tracing::info!(user_id = %current.id, "Profile updated");
    flash::push(&session, Level::Success, "Your profile has been updated.").await;
    Ok(Redirect::to("/users/account/edit").into_response())
}
