//! Authentication service.
//!
//! Password registration and login by email or username.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use tsitsi_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 150;

/// Submitted registration form.
#[derive(Debug, Clone)]
pub struct Registration<'f> {
    pub first_name: &'f str,
    pub last_name: &'f str,
    pub phone_number: &'f str,
    pub email: &'f str,
    pub username: &'f str,
    pub password: &'f str,
    pub confirm_password: &'f str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a customer account. The profile row is created with it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidUsername`,
    /// `AuthError::WeakPassword` or `AuthError::PasswordMismatch` for bad
    /// input, and `AuthError::EmailTaken` / `AuthError::UsernameTaken` when
    /// the account already exists.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        let email = Email::parse(form.email)?;
        let username = validate_username(form.username)?;
        validate_password(form.password)?;
        if form.password != form.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = hash_password(form.password)?;
        let phone = form.phone_number.trim();

        let new_user = NewUser {
            username: username.to_owned(),
            email,
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            phone_number: (!phone.is_empty()).then(|| phone.to_owned()),
            is_staff: false,
        };

        self.users
            .create_with_password(&new_user, &password_hash)
            .await
            .map_err(map_conflict)
    }

    /// Create a staff account (CLI).
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`], minus the confirmation check.
    pub async fn create_staff(
        &self,
        email: &str,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let username = validate_username(username)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let new_user = NewUser {
            username: username.to_owned(),
            email,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            phone_number: None,
            is_staff: true,
        };

        self.users
            .create_with_password(&new_user, &password_hash)
            .await
            .map_err(map_conflict)
    }

    /// Login with email or username and password.
    ///
    /// Unknown users, wrong passwords and deactivated accounts all return
    /// the same `InvalidCredentials` error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if authentication fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some((user, password_hash)) = self.users.get_login(identifier).await? else {
            // Hash anyway so unknown accounts take as long as known ones.
            let _ = hash_password(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        if let Err(e) = self.users.touch_last_login(user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to record last login");
        }

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn map_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(msg) if msg.starts_with("username") => AuthError::UsernameTaken,
        RepositoryError::Conflict(_) => AuthError::EmailTaken,
        other => AuthError::Repository(other),
    }
}

/// Validate a username: letters, digits and `@ . + - _`.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` describing the problem.
pub fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AuthError::InvalidUsername(
            "username may only contain letters, digits and @ . + - _".to_owned(),
        ));
    }
    Ok(username)
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_validate_password_counts_characters_not_bytes() {
        // Seven characters, more than eight bytes.
        assert!(validate_password("éééé ééé").is_ok());
        assert!(validate_password("ééééééé").is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  rova_22 ").unwrap(), "rova_22");
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_conflict_mapping() {
        assert!(matches!(
            map_conflict(RepositoryError::Conflict("username already exists".into())),
            AuthError::UsernameTaken
        ));
        assert!(matches!(
            map_conflict(RepositoryError::Conflict("email already exists".into())),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            map_conflict(RepositoryError::NotFound),
            AuthError::Repository(RepositoryError::NotFound)
        ));
    }
}
