//! Session cart through the storefront router.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tokio::task::JoinSet;

use nature_de_pierre_core::ProductId;
use nature_de_pierre_integration_tests::{Storefront, product};

fn storefront() -> Storefront {
    Storefront::new(vec![
        product(1, "Améthyste brute", dec!(10.00)),
        product(2, "Quartz rose roulé", dec!(4.50)),
    ])
}

fn quantity_of(cart: &Value, product_id: i64) -> Option<i64> {
    cart["items"]
        .as_array()?
        .iter()
        .find(|item| item["productId"].as_i64() == Some(product_id))
        .and_then(|item| item["quantity"].as_i64())
}

#[tokio::test]
async fn test_new_visitor_gets_empty_cart_and_session() {
    let shop = storefront();

    let res = shop.get("/api/cart").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["items"], json!([]));
    assert_eq!(res.body["itemCount"].as_u64(), Some(0));
    assert_eq!(res.body["totalTtc"].as_f64(), Some(0.0));
    assert!(
        shop.session_cookie()
            .is_some_and(|c| c.starts_with("ndp_session="))
    );
}

#[tokio::test]
async fn test_adding_same_product_merges_lines() {
    let shop = storefront();

    let first = shop
        .post("/api/cart/items", &json!({"productId": 1, "quantity": 2}))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let res = shop
        .post("/api/cart/items", &json!({"productId": 1, "quantity": 1}))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(quantity_of(&res.body, 1), Some(3));
    assert_eq!(res.body["totalHt"].as_f64(), Some(30.0));
    assert_eq!(res.body["totalVat"].as_f64(), Some(6.0));
    assert_eq!(res.body["totalTtc"].as_f64(), Some(36.0));
    assert_eq!(res.body["itemCount"].as_u64(), Some(3));
}

#[tokio::test]
async fn test_totals_cover_every_line() {
    let shop = storefront();
    shop.post("/api/cart/items", &json!({"productId": 1})).await;

    let res = shop
        .post("/api/cart/items", &json!({"productId": 2, "quantity": 2}))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["totalHt"].as_f64(), Some(19.0));
    assert_eq!(res.body["totalTtc"].as_f64(), Some(22.8));
    assert_eq!(res.body["itemCount"].as_u64(), Some(3));
}

#[tokio::test]
async fn test_cart_survives_between_requests() {
    let shop = storefront();
    shop.post("/api/cart/items", &json!({"productId": 2, "quantity": 4}))
        .await;

    let res = shop.get("/api/cart").await;

    assert_eq!(quantity_of(&res.body, 2), Some(4));
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let shop = storefront();
    shop.post("/api/cart/items", &json!({"productId": 1})).await;

    shop.forget_session();
    let res = shop.get("/api/cart").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["items"], json!([]));
}

#[tokio::test]
async fn test_set_quantity_and_zero_removes_line() {
    let shop = storefront();
    shop.post("/api/cart/items", &json!({"productId": 1})).await;
    shop.post("/api/cart/items", &json!({"productId": 2})).await;

    let res = shop
        .patch("/api/cart/items/1", &json!({"quantity": 5}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(quantity_of(&res.body, 1), Some(5));

    let res = shop
        .patch("/api/cart/items/2", &json!({"quantity": 0}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(quantity_of(&res.body, 2), None);
    assert_eq!(res.body["itemCount"].as_u64(), Some(5));
}

#[tokio::test]
async fn test_update_of_missing_line_is_not_found() {
    let shop = storefront();

    let res = shop
        .patch("/api/cart/items/2", &json!({"quantity": 3}))
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.code(), Some("CART_ITEM_NOT_FOUND"));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let shop = storefront();
    shop.post("/api/cart/items", &json!({"productId": 1})).await;
    shop.post("/api/cart/items", &json!({"productId": 2})).await;

    let res = shop.delete("/api/cart/items/1").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(quantity_of(&res.body, 1), None);

    let res = shop.delete("/api/cart").await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(shop.get("/api/cart").await.body["items"], json!([]));
}

#[tokio::test]
async fn test_unknown_or_inactive_product_is_rejected() {
    let shop = storefront();
    shop.catalog.deactivate(ProductId::new(2));

    let res = shop
        .post("/api/cart/items", &json!({"productId": 99}))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.code(), Some("PRODUCT_NOT_FOUND"));

    let res = shop.post("/api/cart/items", &json!({"productId": 2})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_quantity_is_rejected() {
    let shop = storefront();

    let res = shop
        .post("/api/cart/items", &json!({"productId": 1, "quantity": 0}))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), Some("INVALID_QUANTITY"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_keep_every_increment() {
    let shop = Arc::new(storefront());
    // Open the session first so every add shares one cart.
    shop.get("/api/cart").await;

    let mut adds = JoinSet::new();
    for _ in 0..6 {
        let shop = Arc::clone(&shop);
        adds.spawn(async move {
            shop.post("/api/cart/items", &json!({"productId": 1}))
                .await
                .status
        });
    }
    while let Some(status) = adds.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let res = shop.get("/api/cart").await;
    assert_eq!(quantity_of(&res.body, 1), Some(6));
}

#[tokio::test]
async fn test_catalog_lists_only_active_products() {
    let shop = storefront();
    shop.catalog.deactivate(ProductId::new(1));

    let res = shop.get("/api/products").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"].as_i64(), Some(1));
    assert_eq!(res.body["items"][0]["id"].as_i64(), Some(2));
    assert_eq!(
        shop.get("/api/products/1").await.status,
        StatusCode::NOT_FOUND
    );
}
