//! Integration tests for product reviews.
//!
//! Requires a `PostgreSQL` server reachable through `DATABASE_URL`.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use tsitsi_core::Rating;
use tsitsi_integration_tests::{create_category, create_product, create_user};
use tsitsi_storefront::db::ReviewRepository;
use tsitsi_storefront::models::review::ReviewInput;

fn review(stars: i64, text: &str) -> ReviewInput {
    ReviewInput {
        rating: Rating::new(stars).unwrap(),
        review: text.to_string(),
    }
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_second_review_updates_in_place(pool: PgPool) {
    let category = create_category(&pool, "Lamba").await;
    let shawl = create_product(&pool, &category, "Lamba hoany", Decimal::new(12_000, 0), 5).await;
    let user_id = create_user(&pool, "voahangy").await;
    let reviews = ReviewRepository::new(&pool);

    let first = reviews
        .upsert(user_id, shawl.id, &review(3, "Joli mais fin"))
        .await
        .unwrap();
    let second = reviews
        .upsert(user_id, shawl.id, &review(5, "Très beau après lavage"))
        .await
        .unwrap();

    assert_eq!(first, second);
    let listed = reviews.list_active(shawl.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].rating, Rating::new(5).unwrap());
    assert_eq!(listed[0].review, "Très beau après lavage");
    assert_eq!(listed[0].author, "voahangy");

    let own = reviews.get_for_user(user_id, shawl.id).await.unwrap().unwrap();
    assert_eq!(own.id, first);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_summary_averages_active_reviews(pool: PgPool) {
    let category = create_category(&pool, "Vannerie").await;
    let basket = create_product(&pool, &category, "Sobika", Decimal::new(4_500, 0), 5).await;
    let reviews = ReviewRepository::new(&pool);

    for (name, stars) in [("lova", 5), ("mamy", 4), ("tiana", 4)] {
        let user_id = create_user(&pool, name).await;
        reviews
            .upsert(user_id, basket.id, &review(stars, "Solide"))
            .await
            .unwrap();
    }

    let summary = reviews.summary(basket.id).await.unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.average, Decimal::new(43, 1));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unreviewed_product_has_empty_summary(pool: PgPool) {
    let category = create_category(&pool, "Soie").await;
    let scarf = create_product(&pool, &category, "Écharpe", Decimal::new(30_000, 0), 5).await;

    let summary = ReviewRepository::new(&pool).summary(scarf.id).await.unwrap();
    assert_eq!(summary.count, 0);
    assert_eq!(summary.average, Decimal::ZERO);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_add_images_reports_what_fit(pool: PgPool) {
    let category = create_category(&pool, "Akanjo").await;
    let shirt = create_product(&pool, &category, "Chemise", Decimal::new(25_000, 0), 5).await;
    let user_id = create_user(&pool, "fara").await;
    let reviews = ReviewRepository::new(&pool);
    let review_id = reviews
        .upsert(user_id, shirt.id, &review(6, "Bonne coupe"))
        .await
        .unwrap();

    let first = vec!["reviews/a.png".to_string(), "reviews/b.png".to_string()];
    assert_eq!(reviews.add_images(review_id, &first).await.unwrap(), 2);

    // Only one slot is left for the second upload.
    let second = vec!["reviews/c.png".to_string(), "reviews/d.png".to_string()];
    assert_eq!(reviews.add_images(review_id, &second).await.unwrap(), 1);
    assert_eq!(reviews.remaining_image_slots(review_id).await.unwrap(), 0);

    let own = reviews.get_for_user(user_id, shirt.id).await.unwrap().unwrap();
    assert_eq!(own.images.len(), 3);
}
