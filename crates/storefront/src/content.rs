//! Cached content: navigation categories and the rendered about page.
//!
//! Both change rarely and appear on many pages, so they are kept in a moka
//! cache for five minutes. Staff edits invalidate the relevant entry.

use std::sync::Arc;
use std::time::Duration;

use comrak::{Options, markdown_to_html};
use moka::future::Cache;
use sqlx::PgPool;

use crate::db::{AboutRepository, CatalogRepository, RepositoryError};
use crate::models::catalog::Category;

/// Title shown when no about page has been written yet.
pub const DEFAULT_ABOUT_TITLE: &str = "About us";

const CATEGORIES_KEY: &str = "nav:categories";
const ABOUT_KEY: &str = "page:about";

/// About page with its Markdown already rendered to HTML.
#[derive(Debug, Clone, Default)]
pub struct RenderedAbout {
    pub title: String,
    pub story_html: String,
    pub mission_html: String,
    pub vision_html: String,
    pub banner_image: Option<String>,
    pub photo_image: Option<String>,
}

impl RenderedAbout {
    fn placeholder() -> Self {
        Self {
            title: DEFAULT_ABOUT_TITLE.to_owned(),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    About(Arc<RenderedAbout>),
}

/// Five-minute cache in front of rarely changing content.
#[derive(Clone)]
pub struct ContentCache {
    cache: Cache<&'static str, CacheValue>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl ContentCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { cache }
    }

    /// Categories for the navigation menu.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading on a cache miss fails.
    pub async fn nav_categories(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) = self.cache.get(CATEGORIES_KEY).await {
            return Ok(categories);
        }

        let categories = Arc::new(CatalogRepository::new(pool).list_categories().await?);
        self.cache
            .insert(CATEGORIES_KEY, CacheValue::Categories(Arc::clone(&categories)))
            .await;
        Ok(categories)
    }

    /// The about page, rendered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading on a cache miss fails.
    pub async fn about(&self, pool: &PgPool) -> Result<Arc<RenderedAbout>, RepositoryError> {
        if let Some(CacheValue::About(about)) = self.cache.get(ABOUT_KEY).await {
            return Ok(about);
        }

        let rendered = AboutRepository::new(pool).first().await?.map_or_else(
            RenderedAbout::placeholder,
            |page| RenderedAbout {
                title: page.title,
                story_html: render_markdown(&page.story),
                mission_html: render_markdown(&page.mission),
                vision_html: render_markdown(&page.vision),
                banner_image: page.banner_image,
                photo_image: page.photo_image,
            },
        );
        let rendered = Arc::new(rendered);
        self.cache
            .insert(ABOUT_KEY, CacheValue::About(Arc::clone(&rendered)))
            .await;
        Ok(rendered)
    }

    /// Drop the cached category list.
    pub async fn invalidate_categories(&self) {
        self.cache.invalidate(CATEGORIES_KEY).await;
    }
}

/// Render Markdown to HTML. Raw HTML in the source is escaped.
#[must_use]
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;

    markdown_to_html(content, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown_basics() {
        let html = render_markdown("# Our story\n\nHand **woven** in Antsirabe.");
        assert!(html.contains("<h1>Our story</h1>"));
        assert!(html.contains("<strong>woven</strong>"));
    }

    #[test]
    fn test_render_markdown_escapes_raw_html() {
        let html = render_markdown("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_markdown_empty() {
        assert_eq!(render_markdown(""), "");
    }

    #[test]
    fn test_placeholder_about() {
        let about = RenderedAbout::placeholder();
        assert_eq!(about.title, DEFAULT_ABOUT_TITLE);
        assert!(about.story_html.is_empty());
    }
}
