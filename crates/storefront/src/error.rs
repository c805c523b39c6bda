//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as JSON:
//!
//! ```json
//! {"error": "Product not found", "code": "PRODUCT_NOT_FOUND"}
//! {"error": "Validation failed", "code": "VALIDATION_FAILED", "fields": [...]}
//! ```
//!
//! Server errors are captured to Sentry and their details are never sent to
//! the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use nature_de_pierre_core::cart::CartError;
use nature_de_pierre_core::validation::{FieldError, ValidationErrors};

use crate::cart::{CartServiceError, CartStoreError};
use crate::db::RepositoryError;
use crate::services::{CheckoutError, PaymentError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    /// Checkout or payment session failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    /// Bad request from client.
    #[error("Bad request: {message}")]
    BadRequest { code: &'static str, message: String },

    /// Missing or invalid credentials (webhook signature).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldError>>,
}

struct Rendered {
    status: StatusCode,
    code: Option<&'static str>,
    message: String,
    fields: Option<Vec<FieldError>>,
}

impl Rendered {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code),
            message: message.into(),
            fields: None,
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: None,
            message: "Internal server error".to_owned(),
            fields: None,
        }
    }

    fn validation(errors: &ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: Some("VALIDATION_FAILED"),
            message: "Validation failed".to_owned(),
            fields: Some(errors.fields.clone()),
        }
    }
}

fn render_repository(err: &RepositoryError) -> Rendered {
    match err {
        RepositoryError::NotFound => Rendered::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found"),
        RepositoryError::Conflict(msg) => {
            Rendered::new(StatusCode::CONFLICT, "CONFLICT", msg.clone())
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => Rendered::internal(),
    }
}

fn render_cart(err: &CartServiceError) -> Rendered {
    match err {
        CartServiceError::Cart(CartError::ItemNotFound(_)) => Rendered::new(
            StatusCode::NOT_FOUND,
            "CART_ITEM_NOT_FOUND",
            "Product is not in the cart",
        ),
        CartServiceError::Cart(e @ (CartError::InvalidQuantity | CartError::QuantityTooLarge { .. })) => {
            Rendered::new(StatusCode::BAD_REQUEST, "INVALID_QUANTITY", e.to_string())
        }
        CartServiceError::Conflict => Rendered::new(
            StatusCode::CONFLICT,
            "CART_CONFLICT",
            "Cart was modified concurrently, please retry",
        ),
        CartServiceError::CheckoutInProgress => Rendered::new(
            StatusCode::CONFLICT,
            "CHECKOUT_IN_PROGRESS",
            "A checkout of this cart is already in progress",
        ),
        CartServiceError::Store(CartStoreError::Unavailable(_) | CartStoreError::Redis(_))
        | CartServiceError::Serialization(_) => Rendered::internal(),
    }
}

fn render_checkout(err: &CheckoutError) -> Rendered {
    match err {
        CheckoutError::Validation(errors) => Rendered::validation(errors),
        CheckoutError::EmptyCart => {
            Rendered::new(StatusCode::BAD_REQUEST, "EMPTY_CART", "Cart is empty")
        }
        CheckoutError::ProductUnavailable(_) => Rendered::new(
            StatusCode::CONFLICT,
            "PRODUCT_UNAVAILABLE",
            "Some products in the cart are no longer available",
        ),
        CheckoutError::OrderNotFound => {
            Rendered::new(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", "Order not found")
        }
        CheckoutError::OrderNotPayable(..) => Rendered::new(
            StatusCode::CONFLICT,
            "ORDER_NOT_PAYABLE",
            "Order can no longer be paid",
        ),
        CheckoutError::Cart(e) => render_cart(e),
        CheckoutError::Repository(e) => render_repository(e),
        CheckoutError::Payment(_) => Rendered::new(
            StatusCode::BAD_GATEWAY,
            "PAYMENT_UNAVAILABLE",
            "Payment service unavailable",
        ),
    }
}

impl AppError {
    fn render(&self) -> Rendered {
        match self {
            Self::Database(e) => render_repository(e),
            Self::Cart(e) => render_cart(e),
            Self::Checkout(e) => render_checkout(e),
            Self::Validation(errors) => Rendered::validation(errors),
            Self::Session(_) | Self::Internal(_) => Rendered::internal(),
            Self::NotFound { code, message } => {
                Rendered::new(StatusCode::NOT_FOUND, *code, message.clone())
            }
            Self::BadRequest { code, message } => {
                Rendered::new(StatusCode::BAD_REQUEST, *code, message.clone())
            }
            Self::Unauthorized(message) => {
                Rendered::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.clone())
            }
            Self::RateLimited => Rendered::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let rendered = self.render();

        // Capture server errors to Sentry
        if rendered.status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            error: rendered.message,
            code: rendered.code,
            fields: rendered.fields,
        };
        (rendered.status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use nature_de_pierre_core::ProductId;

    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::not_found("PRODUCT_NOT_FOUND", "product 12");
        assert_eq!(err.to_string(), "Not found: product 12");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status(AppError::not_found("X", "x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(AppError::Unauthorized("bad signature".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(CartServiceError::Conflict.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CheckoutError::Payment(PaymentError::Status(503)).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(RepositoryError::Conflict("dup".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_cart_item_not_found_body() {
        let err: AppError =
            CartServiceError::Cart(CartError::ItemNotFound(ProductId::new(3))).into();
        let json = body(err).await;
        assert_eq!(json["code"], "CART_ITEM_NOT_FOUND");
        assert!(json.get("fields").is_none());
    }

    #[tokio::test]
    async fn test_checkout_in_progress_body() {
        assert_eq!(
            status(CartServiceError::CheckoutInProgress.into()),
            StatusCode::CONFLICT
        );
        let err: AppError = CheckoutError::Cart(CartServiceError::CheckoutInProgress).into();
        let json = body(err).await;
        assert_eq!(json["code"], "CHECKOUT_IN_PROGRESS");
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("customer.email", "is required");
        let json = body(errors.into()).await;
        assert_eq!(json["code"], "VALIDATION_FAILED");
        assert_eq!(json["fields"][0]["field"], "customer.email");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let json = body(AppError::Internal("password=hunter2".into())).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("code").is_none());
    }
}
