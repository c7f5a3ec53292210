//! About page repository.

use sqlx::PgPool;

use tsitsi_core::AboutPageId;

use super::RepositoryError;
use crate::models::about::AboutPage;

#[derive(Debug, sqlx::FromRow)]
struct AboutRow {
    id: i32,
    title: String,
    story: String,
    mission: String,
    vision: String,
    banner_image: Option<String>,
    photo_image: Option<String>,
}

impl From<AboutRow> for AboutPage {
    fn from(row: AboutRow) -> Self {
        Self {
            id: AboutPageId::new(row.id),
            title: row.title,
            story: row.story,
            mission: row.mission,
            vision: row.vision,
            banner_image: row.banner_image,
            photo_image: row.photo_image,
        }
    }
}

/// Repository for the about page.
pub struct AboutRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AboutRepository<'a> {
    /// Create a new about page repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The first about page row, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first(&self) -> Result<Option<AboutPage>, RepositoryError> {
        let row = sqlx::query_as::<_, AboutRow>(
            r"
            SELECT id, title, story, mission, vision, banner_image, photo_image
            FROM storefront.about_page
            ORDER BY id
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(AboutPage::from))
    }

    /// Replace the about page content, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn save(
        &self,
        title: &str,
        story: &str,
        mission: &str,
        vision: &str,
    ) -> Result<AboutPage, RepositoryError> {
        let existing = self.first().await?;
        let row = match existing {
            Some(page) => {
                sqlx::query_as::<_, AboutRow>(
                    r"
                    UPDATE storefront.about_page
                    SET title = $2, story = $3, mission = $4, vision = $5, updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, title, story, mission, vision, banner_image, photo_image
                    ",
                )
                .bind(page.id)
                .bind(title)
                .bind(story)
                .bind(mission)
                .bind(vision)
                .fetch_one(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, AboutRow>(
                    r"
                    INSERT INTO storefront.about_page (title, story, mission, vision)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, title, story, mission, vision, banner_image, photo_image
                    ",
                )
                .bind(title)
                .bind(story)
                .bind(mission)
                .bind(vision)
                .fetch_one(self.pool)
                .await?
            }
        };

        Ok(row.into())
    }
}
