//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user, or a staff member,
//! in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// If the user is not logged in, returns a redirect to the login page that
/// brings them back afterwards.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires an active staff member.
///
/// Staff rights are checked against the database on every request.
pub struct RequireStaff(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests), carrying the return path.
    RedirectToLogin(String),
    /// Unauthorized response (for API and AJAX requests).
    Unauthorized,
    /// Logged in, but not allowed here.
    Forbidden,
    /// The staff check could not be completed.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to view this page.",
            )
                .into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

/// Login page URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        "/users/login".to_string()
    } else {
        format!("/users/login?next={}", urlencoding::encode(next))
    }
}

/// Whether `next` is a path on this site (not `//host` or `http://…`).
#[must_use]
pub fn is_local_path(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\")
}

fn wants_json(parts: &Parts) -> bool {
    let path = parts.uri.path();
    path.starts_with("/api/") || path.starts_with("/dashboard/api/")
}

fn rejection_for(parts: &Parts) -> AuthRejection {
    if wants_json(parts) {
        AuthRejection::Unauthorized
    } else {
        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());
        AuthRejection::RedirectToLogin(next)
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or_else(|| rejection_for(parts))?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or_else(|| rejection_for(parts))?;

        let is_staff = UserRepository::new(state.pool())
            .is_active_staff(user.id)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Staff check failed");
                AuthRejection::Unavailable
            })?;

        if !is_staff {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-staff dashboard access");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not logged in.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(user): OptionalAuth,
/// ) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.display_name()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Helper to set the current user in the session.
///
/// The session ID is cycled first so a pre-login session ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/"), "/users/login");
        assert_eq!(
            login_url("/cart/checkout?x=1"),
            "/users/login?next=%2Fcart%2Fcheckout%3Fx%3D1"
        );
    }

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/users/account"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("relative"));
    }

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::RedirectToLogin("/dashboard".into())
                .into_response()
                .status(),
            StatusCode::SEE_OTHER
        );
    }
}
