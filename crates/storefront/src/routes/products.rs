//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use nature_de_pierre_core::ProductId;
use nature_de_pierre_core::catalog::{CategoryPublic, ProductFilter, ProductPublic};
use nature_de_pierre_core::pagination::{Page, PageQuery};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// `GET /api/products` - active products, filtered, sorted and paged.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ProductPublic>>> {
    let products = state.catalog().list_products(&filter, page).await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductPublic>> {
    state
        .catalog()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("PRODUCT_NOT_FOUND", "Product not found"))
}

/// `GET /api/categories` - categories with their active product counts.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryPublic>>> {
    Ok(Json(state.catalog().list_categories().await?))
}
