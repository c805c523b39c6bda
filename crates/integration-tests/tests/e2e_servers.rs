//! End-to-end checks against running servers.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database (`ndp-cli migrate`,
//!   `ndp-cli seed catalog seeds/catalog.yaml`)
//! - Both servers running
//! - An admin account whose credentials are in `NDP_E2E_ADMIN_EMAIL` and
//!   `NDP_E2E_ADMIN_PASSWORD` (`ndp-cli admin create`)
//!
//! Run with: `cargo test -p nature-de-pierre-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_owned())
}

/// A client that keeps the storefront session cookie.
fn visitor() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

async fn admin_token(client: &Client) -> String {
    let email = std::env::var("NDP_E2E_ADMIN_EMAIL").expect("NDP_E2E_ADMIN_EMAIL is set");
    let password =
        std::env::var("NDP_E2E_ADMIN_PASSWORD").expect("NDP_E2E_ADMIN_PASSWORD is set");
    let resp = client
        .post(format!("{}/api/admin/auth/login", admin_base_url()))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_owned()
}

#[tokio::test]
#[ignore = "requires running servers"]
async fn test_servers_are_ready() {
    let client = Client::new();
    for base in [storefront_base_url(), admin_base_url()] {
        let resp = client
            .get(format!("{base}/health/ready"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{base}");
    }
}

#[tokio::test]
#[ignore = "requires running servers"]
async fn test_cart_follows_the_session_cookie() {
    let client = visitor();
    let base = storefront_base_url();

    let products: Value = client
        .get(format!("{base}/api/products?perPage=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product_id = products["items"][0]["id"]
        .as_i64()
        .expect("catalog is seeded");

    let resp = client
        .post(format!("{base}/api/cart/items"))
        .json(&json!({"productId": product_id, "quantity": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cart: Value = client
        .get(format!("{base}/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["itemCount"].as_u64(), Some(2));

    let stranger: Value = Client::new()
        .get(format!("{base}/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stranger["itemCount"].as_u64(), Some(0));

    client
        .delete(format!("{base}/api/cart"))
        .send()
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires running servers"]
async fn test_admin_category_lifecycle() {
    let client = Client::new();
    let base = admin_base_url();
    let token = admin_token(&client).await;
    let name = format!("E2E {}", Uuid::new_v4());

    let resp = client
        .post(format!("{base}/api/admin/categories"))
        .bearer_auth(&token)
        .json(&json!({"name": name, "description": "Created by the e2e suite"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{base}/api/admin/categories"))
        .bearer_auth(&token)
        .json(&json!({"name": name.to_uppercase()}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("CATEGORY_NAME_TAKEN"));

    let resp = client
        .post(format!("{base}/api/admin/products"))
        .bearer_auth(&token)
        .json(&json!({"name": format!("{name} pierre"), "categoryId": id, "priceHt": 12.5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = resp.json().await.unwrap();
    let product_id = product["id"].as_i64().unwrap();

    let resp = client
        .delete(format!("{base}/api/admin/categories/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("CATEGORY_HAS_PRODUCTS"));

    let resp = client
        .delete(format!("{base}/api/admin/products/{product_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .delete(format!("{base}/api/admin/categories/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "requires running servers"]
async fn test_admin_login_rejects_wrong_password() {
    let client = Client::new();
    let email = std::env::var("NDP_E2E_ADMIN_EMAIL").expect("NDP_E2E_ADMIN_EMAIL is set");

    let resp = client
        .post(format!("{}/api/admin/auth/login", admin_base_url()))
        .json(&json!({"email": email, "password": "definitely-not-the-password"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("INVALID_CREDENTIALS"));
}
