//! Review domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tsitsi_core::{ProductId, Rating, ReviewId, UserId};

/// Pictures kept per review.
pub const MAX_IMAGES_PER_REVIEW: usize = 3;

/// Longest accepted review text, in characters.
pub const MAX_REVIEW_CHARS: usize = 500;

/// A product review with its author and pictures.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author: String,
    pub rating: Rating,
    pub review: String,
    pub is_active: bool,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Average rating and count over active reviews.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RatingSummary {
    /// Average rounded to one decimal; zero when there are no reviews.
    pub average: Decimal,
    pub count: i64,
}

/// Submitted review content.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub rating: Rating,
    pub review: String,
}
