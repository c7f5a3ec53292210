//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and answered with a generic message; client errors
//! keep their own text. JSON endpoints wrap the same error in [`JsonError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::email::EmailError;
use crate::services::media::UploadError;

const GENERIC_SERVER_MESSAGE: &str = "Something went wrong on our side. Please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Placing an order failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// An uploaded file was rejected or could not be stored.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Outgoing mail failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {e}"))
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        Self::Internal(format!("template: {e}"))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) | Self::Email(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::EmailTaken | AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart
                | CheckoutError::InsufficientStock { .. }
                | CheckoutError::ProductUnavailable { .. } => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upload(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return GENERIC_SERVER_MESSAGE.to_string();
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                "Invalid credentials".to_string()
            }
            Self::Auth(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Upload(err) => err.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests. Please wait and try again.".to_string(),
            _ => GENERIC_SERVER_MESSAGE.to_string(),
        }
    }

    /// Capture server errors to Sentry and log them.
    fn report(&self) {
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (self.status(), self.public_message()).into_response()
    }
}

/// [`AppError`] rendered as `{"error": message}` for JSON endpoints.
#[derive(Debug)]
pub struct JsonError(pub AppError);

impl From<AppError> for JsonError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<RepositoryError> for JsonError {
    fn from(e: RepositoryError) -> Self {
        Self(AppError::Database(e))
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        self.0.report();
        let body = Json(json!({ "error": self.0.public_message() }));
        (self.0.status(), body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action (add to cart, checkout, review).
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Upload(UploadError::UnsupportedType)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "email column held garbage".to_string(),
        ));
        assert_eq!(err.public_message(), GENERIC_SERVER_MESSAGE);

        let err = AppError::Internal("pool exhausted at 10.0.0.4".to_string());
        assert!(!err.public_message().contains("10.0.0.4"));
    }

    #[test]
    fn test_login_failures_share_one_message() {
        assert_eq!(
            AppError::Auth(AuthError::UserNotFound).public_message(),
            AppError::Auth(AuthError::InvalidCredentials).public_message()
        );
    }

    #[test]
    fn test_stock_failure_names_product() {
        let err = AppError::Checkout(CheckoutError::InsufficientStock {
            product: "Lamba hoany".to_string(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "insufficient stock for Lamba hoany");
    }
}
