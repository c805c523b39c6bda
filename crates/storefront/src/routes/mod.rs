//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Database and cart store
//!
//! # Catalog
//! GET    /api/products                         - Active products (filters, sort, pages)
//! GET    /api/products/{id}                    - Product detail
//! GET    /api/categories                       - Categories with product counts
//!
//! # Cart (session)
//! GET    /api/cart                             - Current cart
//! DELETE /api/cart                             - Clear cart
//! POST   /api/cart/items                       - Add {productId, quantity}
//! PATCH  /api/cart/items/{productId}           - Set {quantity}, 0 removes
//! DELETE /api/cart/items/{productId}           - Remove line
//!
//! # Checkout (rate limited)
//! POST   /api/checkout                         - Place order, open payment
//! POST   /api/checkout/steps/{step}/validate   - Validate a wizard step
//! POST   /api/payment/create                   - New payment session for an order
//!
//! # Customers
//! POST   /api/customers                        - Lookup-or-create by email
//! POST   /api/customers/{id}/addresses         - Save an address
//!
//! # Payments and orders
//! POST   /api/payment/webhook                  - Signed provider callback
//! GET    /api/orders/{id}                      - Confirmation (own session only)
//! ```

pub mod cart;
pub mod checkout;
pub mod customers;
pub mod health;
pub mod orders;
pub mod payment;
pub mod products;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tracing::warn;

use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// Create the API routes.
///
/// Checkout routes are rate limited per client IP when `rate_limit` is set.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut checkout_routes = Router::new()
        .route("/checkout", post(checkout::checkout))
        .route("/payment/create", post(payment::create));
    if rate_limit {
        match checkout_rate_limiter() {
            Some(limiter) => checkout_routes = checkout_routes.layer(limiter),
            None => warn!("Checkout rate limiter misconfigured, running without it"),
        }
    }

    let api = Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::show))
        .route("/categories", get(products::categories))
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{product_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/checkout/steps/{step}/validate", post(checkout::validate_step))
        .route("/customers", post(customers::find_or_create))
        .route("/customers/{id}/addresses", post(customers::add_address))
        .route("/payment/webhook", post(payment::webhook))
        .route("/orders/{id}", get(orders::show))
        .merge(checkout_routes);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}
