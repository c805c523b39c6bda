//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                 - Liveness
//! GET    /health/ready                           - Database
//! GET    /uploads/{file}                         - Uploaded product images
//!
//! # Auth
//! POST   /api/admin/auth/login                   - Email + password → bearer token (rate limited)
//! GET    /api/admin/auth/me                      - Account behind the token
//!
//! # Products
//! GET    /api/admin/products                     - Filters, sort, pages
//! POST   /api/admin/products                     - Create
//! GET    /api/admin/products/{id}                - Detail
//! PUT    /api/admin/products/{id}                - Replace
//! DELETE /api/admin/products/{id}                - Delete (never ordered)
//! PATCH  /api/admin/products/{id}/active         - {isActive}
//! POST   /api/admin/products/{id}/image          - Multipart upload, field `image`
//!
//! # Categories
//! GET    /api/admin/categories                   - All, by name
//! POST   /api/admin/categories                   - Create
//! GET    /api/admin/categories/{id}              - Detail
//! PUT    /api/admin/categories/{id}              - Replace
//! DELETE /api/admin/categories/{id}              - Delete (no products)
//!
//! # Customers
//! GET    /api/admin/customers                    - Search, pages
//! POST   /api/admin/customers                    - Create
//! GET    /api/admin/customers/{id}               - Detail
//! PUT    /api/admin/customers/{id}               - Replace
//! DELETE /api/admin/customers/{id}               - Delete (no orders)
//! GET    /api/admin/customers/{id}/addresses     - Address book
//!
//! # Orders
//! GET    /api/admin/orders                       - status, customerId, pages
//! GET    /api/admin/orders/{id}                  - Detail with lines
//! PATCH  /api/admin/orders/{id}/status           - Cancel or ship
//! ```
//!
//! Reads need any valid token; writes need the `admin` role.

pub mod auth;
pub mod categories;
pub mod customers;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use tracing::warn;

use crate::middleware::login_rate_limiter;
use crate::services::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Room for multipart framing around the largest accepted image.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Create the API routes.
///
/// Login is rate limited per client IP when `rate_limit` is set.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut login = Router::new().route("/auth/login", post(auth::login));
    if rate_limit {
        match login_rate_limiter() {
            Some(limiter) => login = login.layer(limiter),
            None => warn!("Login rate limiter misconfigured, running without it"),
        }
    }

    let api = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/active", patch(products::set_active))
        .route(
            "/products/{id}/image",
            post(products::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/{id}",
            get(customers::show)
                .put(customers::update)
                .delete(customers::delete),
        )
        .route("/customers/{id}/addresses", get(customers::addresses))
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
        .merge(login);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/admin", api)
}
