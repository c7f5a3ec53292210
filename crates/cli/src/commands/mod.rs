//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod staff;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(tsitsi_storefront::db::create_pool(&database_url).await?)
}
