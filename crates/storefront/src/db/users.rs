//! User repository for accounts, passwords and profiles.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use tsitsi_core::{Email, UserId};

use super::RepositoryError;
use crate::models::user::{NewUser, Profile, ProfileUpdate, User};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.first_name, u.last_name, \
     u.phone_number, u.is_active, u.is_staff, u.created_at, u.updated_at";

const RETURNING_USER: &str = "id, username, email, first_name, last_name, \
     phone_number, is_active, is_staff, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    is_active: bool,
    is_staff: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            is_active: row.is_active,
            is_staff: row.is_staff,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoginRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: i32,
    address_line_1: String,
    address_line_2: String,
    city: String,
    state: String,
    country: String,
    profile_picture: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: Some(UserId::new(row.user_id)),
            address_line_1: row.address_line_1,
            address_line_2: row.address_line_2,
            city: row.city,
            state: row.state,
            country: row.country,
            profile_picture: row.profile_picture,
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user u WHERE lower(u.email) = lower($1)"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Find a user and their password hash by email or username.
    ///
    /// Returns `None` if no user matches or the user has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_login(
        &self,
        identifier: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, LoginRow>(&format!(
            r"
            SELECT {USER_COLUMNS}, p.password_hash
            FROM storefront.user u
            LEFT JOIN storefront.user_password p ON u.id = p.user_id
            WHERE lower(u.email) = lower($1) OR u.username = $1
            ORDER BY (lower(u.email) = lower($1)) DESC
            LIMIT 1
            "
        ))
        .bind(identifier.trim())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Some(password_hash) = row.password_hash else {
            return Ok(None);
        };

        Ok(Some((User::try_from(row.user)?, password_hash)))
    }

    /// Create a user with a password and an empty profile in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, new_user, password_hash), fields(username = %new_user.username))]
    pub async fn create_with_password(
        &self,
        new_user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO storefront.user
                (username, email, first_name, last_name, phone_number, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RETURNING_USER}
            "
        ))
        .bind(&new_user.username)
        .bind(new_user.email.as_str())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone_number)
        .bind(new_user.is_staff)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let field = if db_err.constraint().is_some_and(|c| c.contains("username")) {
                    "username"
                } else {
                    "email"
                };
                return RepositoryError::Conflict(format!("{field} already exists"));
            }
            RepositoryError::Database(e)
        })?;

        let user = User::try_from(row)?;

        sqlx::query(
            r"
            INSERT INTO storefront.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(user.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO storefront.user_profile (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Get a user's profile, creating an empty one if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(&self, user_id: UserId) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO storefront.user_profile (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, address_line_1, address_line_2, city, state, country,
                      profile_picture
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update the account names, phone and profile address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE storefront.user
            SET first_name = $2, last_name = $3, phone_number = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(user_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO storefront.user_profile
                (user_id, address_line_1, address_line_2, city, state, country, profile_picture)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                address_line_1 = EXCLUDED.address_line_1,
                address_line_2 = EXCLUDED.address_line_2,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                country = EXCLUDED.country,
                profile_picture = COALESCE(EXCLUDED.profile_picture,
                                           storefront.user_profile.profile_picture),
                updated_at = NOW()
            RETURNING user_id, address_line_1, address_line_2, city, state, country,
                      profile_picture
            ",
        )
        .bind(user_id)
        .bind(&update.address_line_1)
        .bind(&update.address_line_2)
        .bind(&update.city)
        .bind(&update.state)
        .bind(&update.country)
        .bind(&update.profile_picture)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Grant or revoke staff rights.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    pub async fn set_staff(&self, email: &Email, is_staff: bool) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE storefront.user
            SET is_staff = $2, updated_at = NOW()
            WHERE lower(email) = lower($1)
            RETURNING {RETURNING_USER}
            "
        ))
        .bind(email.as_str())
        .bind(is_staff)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Whether the user exists, is active and is staff.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_active_staff(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT is_staff AND is_active FROM storefront.user WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some_and(|(staff,)| staff))
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn touch_last_login(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE storefront.user SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
