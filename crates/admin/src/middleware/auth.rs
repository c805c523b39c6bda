//! Authentication extractors for admin.
//!
//! Every route except login requires an `Authorization: Bearer <token>`
//! header carrying a token issued by [`crate::services::TokenIssuer`].

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 if the header is missing or the token does not verify.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdmin(admin): RequireAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// Extractor that requires a token whose role may write.
///
/// Rejects with 401 like [`RequireAdmin`], and with 403 for read-only roles.
pub struct RequireWriter(pub CurrentAdmin);

/// Token from an `Authorization: Bearer` header, if present.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let admin = state.tokens().verify(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized
        })?;

        set_sentry_user(admin.id, &admin.email);
        Ok(Self(admin))
    }
}

impl FromRequestParts<AppState> for RequireWriter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAdmin(admin) = RequireAdmin::from_request_parts(parts, state).await?;
        if !admin.can_write() {
            return Err(AppError::Forbidden);
        }
        Ok(Self(admin))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/admin/products");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&parts(None)), None);
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer"))), None);
    }
}
