//! Product review submission.

use axum::{
    extract::{Multipart, Path, State},
    response::Redirect,
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use tsitsi_core::{ProductId, Rating};

use super::multipart::MultipartForm;
use crate::db::{CatalogRepository, ReviewRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::flash::{self, Level};
use crate::models::review::{MAX_REVIEW_CHARS, ReviewInput};
use crate::services::media::UploadError;
use crate::state::AppState;

/// Media folder for review pictures.
const REVIEW_MEDIA_FOLDER: &str = "reviews";

/// Check the rating and text fields.
fn parse_review(form: &MultipartForm) -> std::result::Result<ReviewInput, String> {
    let rating = Rating::parse(form.text("rating")).map_err(|e| format!("Rating: {e}."))?;
    let review = form.text("review");
    if review.chars().count() > MAX_REVIEW_CHARS {
        return Err(format!(
            "Your review must be at most {MAX_REVIEW_CHARS} characters."
        ));
    }
    Ok(ReviewInput {
        rating,
        review: review.to_owned(),
    })
}

/// Create or update the user's review of a product, with up to three
/// pictures in total.
#[instrument(skip(state, session, user, multipart), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Redirect> {
    let product = CatalogRepository::new(state.pool())
        .get_product(product_id)
        .await?
        .filter(|p| p.is_available)
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    let back = Redirect::to(&product.url());

    let form = MultipartForm::read(multipart).await?;
    let input = match parse_review(&form) {
        Ok(input) => input,
        Err(message) => {
            flash::push(&session, Level::Error, message).await;
            return Ok(back);
        }
    };

    let reviews = ReviewRepository::new(state.pool());
    let existing = reviews.get_for_user(user.id, product_id).await?.is_some();
    let review_id = reviews.upsert(user.id, product_id, &input).await?;

    let slots = reviews.remaining_image_slots(review_id).await?;
    let mut stored = Vec::new();
    let mut rejected = 0_usize;
    let today = Utc::now().date_naive();
    for bytes in form.files("images").take(slots) {
        match state
            .media()
            .save_image(REVIEW_MEDIA_FOLDER, today, bytes)
            .await
        {
            Ok(path) => stored.push(path),
            Err(e @ UploadError::Io(_)) => return Err(e.into()),
            Err(e) => {
                tracing::info!(error = %e, "Review picture rejected");
                rejected += 1;
            }
        }
    }
    if !stored.is_empty() {
        // Another upload may have taken the free slots since we counted them.
        let attached = reviews.add_images(review_id, &stored).await?;
        if let Some(unused) = stored.get(attached..).filter(|rest| !rest.is_empty()) {
            state.media().discard(unused).await;
        }
    }

    add_breadcrumb(
        "review",
        if existing { "Review updated" } else { "Review created" },
        &[("product_id", product_id.to_string())],
    );

    let message = if existing {
        "Thank you! Your review has been updated."
    } else {
        "Thank you! Your review has been submitted."
    };
    flash::push(&session, Level::Success, message).await;
    if rejected > 0 {
        flash::push(
            &session,
            Level::Warning,
            "Some pictures were skipped. Use JPEG, PNG, WebP or GIF files under 5 MB.",
        )
        .await;
    }

    Ok(back)
}
