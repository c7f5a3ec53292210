//! Smoke tests against a running storefront.
//!
//! These tests require:
//! - A running `PostgreSQL` database (task db:start)
//! - The storefront running (cargo run -p tsitsi-storefront)
//!
//! Set `STOREFRONT_BASE_URL` to point elsewhere than `http://localhost:3000`.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tsitsi_integration_tests::storefront_base_url;

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_health_endpoints() {
    let base = storefront_base_url();
    let client = client();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(format!("{base}/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_api_lists_products() {
    let base = storefront_base_url();
    let resp = client()
        .get(format!("{base}/api/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert!(body["products"].is_array());
    assert!(body["page"].is_object());
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_api_reviews_require_product() {
    let base = storefront_base_url();
    let resp = client()
        .get(format!("{base}/api/reviews"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_dashboard_requires_login() {
    let base = storefront_base_url();
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let resp = client
        .get(format!("{base}/dashboard"))
        .send()
        .await
        .unwrap();
    assert!(
        resp.status().is_redirection() || resp.status() == StatusCode::UNAUTHORIZED,
        "dashboard answered {}",
        resp.status()
    );
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_empty_cart_page_renders() {
    let base = storefront_base_url();
    let resp = client().get(format!("{base}/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("cart"));
}
