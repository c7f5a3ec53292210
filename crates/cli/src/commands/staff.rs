//! Staff account management.
//!
//! Staff accounts can open the dashboard. They are never created through
//! the public registration form.

use thiserror::Error;

use tsitsi_core::Email;
use tsitsi_storefront::db::{RepositoryError, UserRepository};
use tsitsi_storefront::services::auth::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during staff operations.
#[derive(Debug, Error)]
pub enum StaffError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] tsitsi_core::EmailError),

    #[error("No account with email: {0}")]
    UnknownUser(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a staff account.
///
/// # Errors
///
/// Returns an error if validation fails or the email or username is taken.
pub async fn create(
    email: &str,
    username: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), StaffError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .create_staff(email, username, password, first_name, last_name)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Staff account created");
    Ok(())
}

/// Grant dashboard access to an existing account.
///
/// # Errors
///
/// Returns an error if the email is invalid or no such account exists.
pub async fn promote(email: &str) -> Result<(), StaffError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_staff(&email, true)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => StaffError::UnknownUser(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "Account promoted to staff");
    Ok(())
}
