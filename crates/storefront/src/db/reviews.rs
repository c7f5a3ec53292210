//! Review repository. One review per `(user, product)`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use tsitsi_core::{ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::review::{MAX_IMAGES_PER_REVIEW, RatingSummary, Review, ReviewInput};

const REVIEW_SELECT: &str = r"
    SELECT r.id, r.product_id, r.user_id,
           COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS author,
           r.rating, r.review, r.is_active, r.created_at, r.updated_at
    FROM storefront.review r
    JOIN storefront.user u ON u.id = r.user_id
";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    author: String,
    rating: Rating,
    review: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self, images: Vec<String>) -> Review {
        Review {
            id: ReviewId::new(self.id),
            product_id: ProductId::new(self.product_id),
            user_id: UserId::new(self.user_id),
            author: self.author,
            rating: self.rating,
            review: self.review,
            is_active: self.is_active,
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the user's review of a product, or update it in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, input), fields(rating = %input.rating))]
    pub async fn upsert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        input: &ReviewInput,
    ) -> Result<ReviewId, RepositoryError> {
        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO storefront.review (product_id, user_id, rating, review)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET rating = EXCLUDED.rating, review = EXCLUDED.review, updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(input.rating)
        .bind(&input.review)
        .fetch_one(self.pool)
        .await?;

        Ok(ReviewId::new(id))
    }

    /// How many more pictures the review can take.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remaining_image_slots(&self, review_id: ReviewId) -> Result<usize, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM storefront.review_image WHERE review_id = $1")
                .bind(review_id)
                .fetch_one(self.pool)
                .await?;

        let used = usize::try_from(count).unwrap_or(MAX_IMAGES_PER_REVIEW);
        Ok(MAX_IMAGES_PER_REVIEW.saturating_sub(used))
    }

    /// Attach pictures, keeping at most [`MAX_IMAGES_PER_REVIEW`] in total.
    /// Returns how many were stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_images(
        &self,
        review_id: ReviewId,
        paths: &[String],
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent uploads for the same review.
        sqlx::query("SELECT id FROM storefront.review WHERE id = $1 FOR UPDATE")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM storefront.review_image WHERE review_id = $1")
                .bind(review_id)
                .fetch_one(&mut *tx)
                .await?;
        let used = usize::try_from(count).unwrap_or(MAX_IMAGES_PER_REVIEW);
        let room = MAX_IMAGES_PER_REVIEW.saturating_sub(used);

        let mut stored = 0;
        for path in paths.iter().take(room) {
            sqlx::query("INSERT INTO storefront.review_image (review_id, image) VALUES ($1, $2)")
                .bind(review_id)
                .bind(path)
                .execute(&mut *tx)
                .await?;
            stored += 1;
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn images_for(
        &self,
        review_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<String>>, RepositoryError> {
        if review_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, String)> = sqlx::query_as(
            r"
            SELECT review_id, image FROM storefront.review_image
            WHERE review_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(review_ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_review: HashMap<i32, Vec<String>> = HashMap::new();
        for (review_id, image) in rows {
            by_review.entry(review_id).or_default().push(image);
        }
        Ok(by_review)
    }

    /// Active reviews of a product, newest first, with their pictures.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_active(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 AND r.is_active \
             ORDER BY r.updated_at DESC, r.id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut images = self.images_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let pictures = images.remove(&row.id).unwrap_or_default();
                row.into_review(pictures)
            })
            .collect())
    }

    /// The user's own review of a product, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE r.user_id = $1 AND r.product_id = $2"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let images = self.images_for(&[row.id]).await?.remove(&row.id);
        Ok(Some(row.into_review(images.unwrap_or_default())))
    }

    /// Average rating (one decimal) and count over active reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, product_id: ProductId) -> Result<RatingSummary, RepositoryError> {
        let (average, count): (Option<Decimal>, i64) = sqlx::query_as(
            r"
            SELECT ROUND(AVG(rating)::numeric, 1), COUNT(*)
            FROM storefront.review
            WHERE product_id = $1 AND is_active
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(RatingSummary {
            average: average.unwrap_or(Decimal::ZERO),
            count,
        })
    }
}
