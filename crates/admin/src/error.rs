//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`; errors render as JSON
//! `{"error": ..., "code": ..., "fields": [...]}` with server error details
//! kept out of the response body.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use nature_de_pierre_core::AdminUserId;
use nature_de_pierre_core::order::OrderError;
use nature_de_pierre_core::validation::{FieldError, ValidationErrors};

use crate::db::RepositoryError;
use crate::db::orders::StatusChangeError;
use crate::services::{AuthError, UploadError};

/// Application-level error type for admin.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Image upload rejected or not stored.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Multipart body could not be read.
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    /// Bad request from client.
    #[error("Bad request: {message}")]
    BadRequest { code: &'static str, message: String },

    /// Request conflicts with the current state of a resource.
    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    /// Missing or invalid bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed.
    #[error("Forbidden")]
    Forbidden,

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

    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }
}

impl From<StatusChangeError> for AppError {
    fn from(err: StatusChangeError) -> Self {
        match err {
            StatusChangeError::Repository(RepositoryError::NotFound) => {
                Self::not_found("ORDER_NOT_FOUND", "Order not found")
            }
            StatusChangeError::Repository(e) => Self::Database(e),
            StatusChangeError::Transition(e @ OrderError::InvalidTransition { .. }) => {
                Self::conflict("INVALID_STATUS_TRANSITION", e.to_string())
            }
            StatusChangeError::Transition(e @ OrderError::EmptyCart) => {
                Self::Internal(e.to_string())
            }
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

    fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Authentication required",
        )
    }
}

fn render_repository(err: &RepositoryError) -> Rendered {
    match err {
        RepositoryError::NotFound => Rendered::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found"),
        RepositoryError::Conflict(msg) => Rendered::new(StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        RepositoryError::InUse(msg) => Rendered::new(StatusCode::CONFLICT, "IN_USE", msg.clone()),
        RepositoryError::InvalidReference(msg) => {
            Rendered::new(StatusCode::BAD_REQUEST, "INVALID_REFERENCE", msg.clone())
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => Rendered::internal(),
    }
}

fn render_auth(err: &AuthError) -> Rendered {
    match err {
        AuthError::InvalidCredentials => Rendered::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid email or password",
        ),
        AuthError::InvalidToken => Rendered::unauthorized(),
        AuthError::InvalidEmail(e) => {
            Rendered::new(StatusCode::BAD_REQUEST, "INVALID_EMAIL", e.to_string())
        }
        AuthError::WeakPassword(msg) => {
            Rendered::new(StatusCode::BAD_REQUEST, "WEAK_PASSWORD", msg.clone())
        }
        AuthError::Repository(e) => render_repository(e),
        AuthError::Token(_) | AuthError::PasswordHash => Rendered::internal(),
    }
}

fn render_upload(err: &UploadError) -> Rendered {
    match err {
        UploadError::TooLarge { .. } => {
            Rendered::new(StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE", err.to_string())
        }
        UploadError::Empty | UploadError::UnsupportedType(_) | UploadError::ContentMismatch(_) => {
            Rendered::new(StatusCode::BAD_REQUEST, "INVALID_IMAGE", err.to_string())
        }
        UploadError::Io(_) => Rendered::internal(),
    }
}

impl AppError {
    fn render(&self) -> Rendered {
        match self {
            Self::Database(e) => render_repository(e),
            Self::Validation(errors) => Rendered::validation(errors),
            Self::Auth(e) => render_auth(e),
            Self::Upload(e) => render_upload(e),
            Self::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => Rendered::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "IMAGE_TOO_LARGE",
                "Request body is too large",
            ),
            Self::Multipart(e) => Rendered::new(e.status(), "INVALID_MULTIPART", e.body_text()),
            Self::NotFound { code, message } => {
                Rendered::new(StatusCode::NOT_FOUND, *code, message.clone())
            }
            Self::BadRequest { code, message } => {
                Rendered::new(StatusCode::BAD_REQUEST, *code, message.clone())
            }
            Self::Conflict { code, message } => {
                Rendered::new(StatusCode::CONFLICT, *code, message.clone())
            }
            Self::Unauthorized => Rendered::unauthorized(),
            Self::Forbidden => Rendered::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Your role does not allow this action",
            ),
            Self::Internal(_) => Rendered::internal(),
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

/// Set the admin user context for Sentry error tracking.
///
/// Call this after authenticating a request so errors are associated
/// with the admin user who triggered them.
pub fn set_sentry_user(admin_user_id: AdminUserId, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: Some(email.to_owned()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use nature_de_pierre_core::OrderStatus;

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
        let err = AppError::not_found("ORDER_NOT_FOUND", "order 123");
        assert_eq!(err.to_string(), "Not found: order 123");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthError::InvalidToken.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(RepositoryError::InUse("x".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(RepositoryError::InvalidReference("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(UploadError::TooLarge { size: 6_000_000 }.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status(UploadError::UnsupportedType("image/gif".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_invalid_transition_body() {
        let err: AppError = StatusChangeError::Transition(OrderError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        })
        .into();
        let json = body(err).await;
        assert_eq!(json["code"], "INVALID_STATUS_TRANSITION");
    }

    #[tokio::test]
    async fn test_missing_order_on_status_change() {
        let err: AppError = StatusChangeError::Repository(RepositoryError::NotFound).into();
        let json = body(err).await;
        assert_eq!(json["code"], "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_conflict_body() {
        let json = body(AppError::conflict("CATEGORY_NAME_TAKEN", "Name taken")).await;
        assert_eq!(json["code"], "CATEGORY_NAME_TAKEN");
        assert_eq!(json["error"], "Name taken");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let json = body(RepositoryError::DataCorruption("bad role 'root'".into()).into()).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("code").is_none());
    }
}
