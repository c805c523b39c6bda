//! Checkout, payment sessions and provider webhooks through the storefront
//! router.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::{Value, json};

use nature_de_pierre_core::{OrderId, OrderStatus, ProductId};
use nature_de_pierre_integration_tests::{
    FakePayments, Storefront, WEBHOOK_SECRET, product,
};
use nature_de_pierre_storefront::services::payment::sign;

fn storefront() -> Storefront {
    Storefront::new(vec![
        product(1, "Améthyste brute", dec!(10.00)),
        product(2, "Quartz rose roulé", dec!(4.50)),
    ])
}

fn checkout_body(email: &str) -> Value {
    json!({
        "customer": {
            "email": email,
            "firstName": "Claire",
            "lastName": "Martin",
        },
        "shippingAddress": {
            "firstName": "Claire",
            "lastName": "Martin",
            "line1": "12 rue des Lilas",
            "postalCode": "69003",
            "city": "Lyon",
            "country": "fr",
        },
        "billingSameAsShipping": true,
    })
}

fn field_names(body: &Value) -> Vec<String> {
    body["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["field"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

async fn fill_cart(shop: &Storefront) {
    let res = shop
        .post("/api/cart/items", &json!({"productId": 1, "quantity": 2}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

fn signed(body: &Value) -> (Vec<u8>, String) {
    let bytes = body.to_string().into_bytes();
    let signature = sign(&SecretString::from(WEBHOOK_SECRET), &bytes);
    (bytes, signature)
}

#[tokio::test]
async fn test_checkout_places_order_and_opens_payment() {
    let shop = storefront();
    fill_cart(&shop).await;

    let res = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["orderId"].as_i64(), Some(1));
    assert!(res.body["reference"].as_str().unwrap().starts_with("NDP-"));
    assert_eq!(
        res.body["paymentUrl"].as_str(),
        Some("https://pay.test/session/1")
    );
    assert_eq!(res.body["totals"]["totalTtc"].as_f64(), Some(24.0));

    let orders = shop.orders.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::PendingPayment);
    assert_eq!(orders[0].total_ht, dec!(20.00));
    assert_eq!(orders[0].shipping_address.country, "FR");
    assert_eq!(orders[0].billing_address, orders[0].shipping_address);

    let requests = shop.payments.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, dec!(24.00));
    assert_eq!(requests[0].customer_email, "claire@example.fr");
    assert!(requests[0].return_url.ends_with("orderId=1"));
    assert_eq!(shop.orders.intents().len(), 1);

    assert_eq!(shop.customers.customers().len(), 1);
    assert_eq!(shop.customers.addresses().len(), 1);
    assert_eq!(shop.get("/api/cart").await.body["items"], json!([]));
}

#[tokio::test]
async fn test_invalid_checkout_writes_nothing() {
    let shop = storefront();
    fill_cart(&shop).await;

    let mut body = checkout_body("");
    body["customer"]["firstName"] = json!("  ");

    let res = shop.post("/api/checkout", &body).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), Some("VALIDATION_FAILED"));
    let fields = field_names(&res.body);
    assert!(fields.contains(&"customer.email".to_owned()));
    assert!(fields.contains(&"customer.firstName".to_owned()));

    assert!(shop.customers.customers().is_empty());
    assert!(shop.orders.orders().is_empty());
    assert!(shop.payments.requests().is_empty());
    assert_eq!(
        shop.get("/api/cart").await.body["items"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_missing_billing_address_is_reported() {
    let shop = storefront();
    fill_cart(&shop).await;
    let mut body = checkout_body("claire@example.fr");
    body["billingSameAsShipping"] = json!(false);

    let res = shop.post("/api/checkout", &body).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(field_names(&res.body), vec!["billingAddress".to_owned()]);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let shop = storefront();

    let res = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), Some("EMPTY_CART"));
    assert!(shop.orders.orders().is_empty());
}

#[tokio::test]
async fn test_payment_failure_cancels_order_and_keeps_cart() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.payments.fail();

    let res = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    assert_eq!(res.code(), Some("PAYMENT_UNAVAILABLE"));
    assert_eq!(shop.orders.cancelled(), vec![OrderId::new(1)]);
    assert_eq!(
        shop.orders.status(OrderId::new(1)),
        Some(OrderStatus::Cancelled)
    );
    assert!(shop.orders.intents().is_empty());

    let cart = shop.get("/api/cart").await;
    assert_eq!(cart.body["itemCount"].as_u64(), Some(2));
}

#[tokio::test]
async fn test_second_checkout_of_same_cart_is_refused() {
    let shop = Arc::new(storefront());
    fill_cart(&shop).await;
    shop.payments.hold();

    let first = {
        let shop = Arc::clone(&shop);
        tokio::spawn(async move {
            shop.post("/api/checkout", &checkout_body("claire@example.fr"))
                .await
        })
    };
    shop.payments.wait_for_requests(1).await;

    let second = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.code(), Some("CHECKOUT_IN_PROGRESS"));

    shop.payments.release();
    assert_eq!(first.await.unwrap().status, StatusCode::CREATED);
    assert_eq!(shop.orders.orders().len(), 1);
    assert_eq!(shop.payments.requests().len(), 1);

    let again = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;
    assert_eq!(again.code(), Some("EMPTY_CART"));
}

#[tokio::test]
async fn test_lines_added_during_checkout_stay_in_cart() {
    let shop = Arc::new(storefront());
    fill_cart(&shop).await;
    shop.payments.hold();

    let checkout = {
        let shop = Arc::clone(&shop);
        tokio::spawn(async move {
            shop.post("/api/checkout", &checkout_body("claire@example.fr"))
                .await
        })
    };
    shop.payments.wait_for_requests(1).await;

    let res = shop
        .post("/api/cart/items", &json!({"productId": 2}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = shop
        .post("/api/cart/items", &json!({"productId": 1}))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    shop.payments.release();
    assert_eq!(checkout.await.unwrap().status, StatusCode::CREATED);

    let orders = shop.orders.orders();
    let order = &orders[0];
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].product_id, ProductId::new(1));
    assert_eq!(order.items[0].quantity, 2);

    let cart = shop.get("/api/cart").await;
    assert_eq!(cart.body["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart.body["itemCount"].as_u64(), Some(2));
}

#[tokio::test]
async fn test_checkout_reprices_against_live_catalog() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.catalog.set_price(ProductId::new(1), dec!(12.50));

    let res = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["totals"]["totalHt"].as_f64(), Some(25.0));
    assert_eq!(shop.orders.orders()[0].items[0].unit_price_ht, dec!(12.50));
}

#[tokio::test]
async fn test_withdrawn_product_blocks_checkout() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.catalog.deactivate(ProductId::new(1));

    let res = shop
        .post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), Some("PRODUCT_UNAVAILABLE"));
    assert!(shop.orders.orders().is_empty());
}

#[tokio::test]
async fn test_returning_customer_is_reused() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    fill_cart(&shop).await;
    let res = shop
        .post("/api/checkout", &checkout_body("Claire@Example.FR"))
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(shop.customers.customers().len(), 1);
    let orders = shop.orders.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].customer_id, orders[1].customer_id);
}

#[tokio::test]
async fn test_order_is_visible_only_to_the_session_that_placed_it() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    let res = shop.get("/api/orders/1").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"].as_str(), Some("pending_payment"));

    shop.forget_session();
    let res = shop.get("/api/orders/1").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.code(), Some("ORDER_NOT_FOUND"));
}

#[tokio::test]
async fn test_new_payment_session_for_unpaid_order() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    let res = shop
        .post("/api/payment/create", &json!({"orderId": 1}))
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["orderId"].as_i64(), Some(1));
    assert_eq!(shop.orders.intents().len(), 2);

    shop.forget_session();
    let res = shop
        .post("/api/payment/create", &json!({"orderId": 1}))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_step_validation() {
    let shop = storefront();
    let body = checkout_body("claire@example.fr");

    let res = shop
        .post("/api/checkout/steps/customer/validate", &json!({"customer": body["customer"]}))
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = shop
        .post("/api/checkout/steps/addresses/validate", &json!({"shippingAddress": {}}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let fields = field_names(&res.body);
    assert!(fields.contains(&"shippingAddress.line1".to_owned()));
    assert!(fields.iter().all(|f| !f.starts_with("customer.")));

    let res = shop
        .post("/api/checkout/steps/payment/validate", &body)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.code(), Some("UNKNOWN_STEP"));
}

#[tokio::test]
async fn test_signed_webhook_marks_order_paid_once() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    let event = json!({
        "paymentId": FakePayments::payment_id(OrderId::new(1)),
        "status": "succeeded",
    });
    let (body, signature) = signed(&event);

    let res = shop.webhook(&body, Some(&signature)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["outcome"].as_str(), Some("applied"));
    assert_eq!(shop.orders.status(OrderId::new(1)), Some(OrderStatus::Paid));

    let res = shop.webhook(&body, Some(&signature)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["outcome"].as_str(), Some("already_final"));
}

#[tokio::test]
async fn test_failed_payment_event_marks_order() {
    let shop = storefront();
    fill_cart(&shop).await;
    shop.post("/api/checkout", &checkout_body("claire@example.fr"))
        .await;

    let pending = json!({"paymentId": "pay_1", "status": "pending"});
    let (body, signature) = signed(&pending);
    let res = shop.webhook(&body, Some(&signature)).await;
    assert_eq!(res.body["outcome"].as_str(), Some("ignored"));

    let failed = json!({"paymentId": "pay_1", "status": "failed"});
    let (body, signature) = signed(&failed);
    let res = shop.webhook(&body, Some(&signature)).await;
    assert_eq!(res.body["outcome"].as_str(), Some("applied"));
    assert_eq!(
        shop.orders.status(OrderId::new(1)),
        Some(OrderStatus::PaymentFailed)
    );
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures() {
    let shop = storefront();
    let event = json!({"paymentId": "pay_1", "status": "succeeded"});
    let (body, _) = signed(&event);
    let forged = sign(&SecretString::from("not-the-secret"), &body);

    let res = shop.webhook(&body, Some(&forged)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.code(), Some("UNAUTHORIZED"));

    let res = shop.webhook(&body, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let (_, signature) = signed(&json!({"paymentId": "pay_2", "status": "succeeded"}));
    let res = shop.webhook(&body, Some(&signature)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_for_unknown_payment_is_not_found() {
    let shop = storefront();
    let (body, signature) = signed(&json!({"paymentId": "pay_404", "status": "succeeded"}));

    let res = shop.webhook(&body, Some(&signature)).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.code(), Some("PAYMENT_NOT_FOUND"));
}
