//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::content::ContentCache;
use crate::services::email::EmailService;
use crate::services::media::MediaStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    content: ContentCache,
    media: MediaStore,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Email is disabled when SMTP is not configured or the relay cannot be
    /// set up; the contact form then reports an error to the visitor.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let email = config
            .email
            .as_ref()
            .and_then(|email_config| match EmailService::new(email_config) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::warn!(error = %e, "SMTP relay unavailable, email disabled");
                    None
                }
            });
        if email.is_none() {
            tracing::info!("Email sending is disabled");
        }

        let media = MediaStore::new(config.media_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                content: ContentCache::default(),
                media,
                email,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Cached navigation categories and about page.
    #[must_use]
    pub fn content(&self) -> &ContentCache {
        &self.inner.content
    }

    /// Upload storage.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    /// The mailer, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
