//! Login and session identity.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::AdminUser;
use crate::services::{AuthService, LoginResponse};
use crate::state::AppState;

/// Body of `POST /auth/login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/admin/auth/login` - exchange credentials for a bearer token.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = AuthService::new(state.pool(), state.tokens())
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(response))
}

/// `GET /api/admin/auth/me` - the account behind the token.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<AdminUser>> {
    AdminUserRepository::new(state.pool())
        .get_by_id(admin.id)
        .await?
        .map(Json)
        .ok_or(AppError::Unauthorized)
}
