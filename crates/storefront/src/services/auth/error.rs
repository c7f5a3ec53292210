//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tsitsi_core::EmailError),

    /// Invalid credentials (wrong password, unknown or inactive user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// The email address is already registered.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// The username is already registered.
    #[error("this username is already taken")]
    UsernameTaken,

    /// Username is empty, too long or has characters outside the allowed set.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the message is safe and useful to show next to the form.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
