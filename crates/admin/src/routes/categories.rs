//! Category management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use nature_de_pierre_core::CategoryId;
use nature_de_pierre_core::catalog::{Category, CategoryInput};

use crate::db::{CategoryRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

fn category_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => not_found(),
        RepositoryError::Conflict(msg) => AppError::conflict("CATEGORY_NAME_TAKEN", msg),
        RepositoryError::InUse(msg) => AppError::conflict("CATEGORY_HAS_PRODUCTS", msg),
        other => other.into(),
    }
}

fn not_found() -> AppError {
    AppError::not_found("CATEGORY_NOT_FOUND", "Category not found")
}

/// `GET /api/admin/categories`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// `GET /api/admin/categories/{id}`
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `POST /api/admin/categories`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    input.validate()?;
    let category = CategoryRepository::new(state.pool())
        .create(&input.normalized())
        .await
        .map_err(category_error)?;

    info!(category_id = %category.id, name = %category.name, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/admin/categories/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    input.validate()?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input.normalized())
        .await
        .map_err(category_error)?;
    Ok(Json(category))
}

/// `DELETE /api/admin/categories/{id}` - refused while products belong to it.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(category_error)?;

    info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
