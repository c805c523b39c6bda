//! Product management and image uploads.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use tracing::{info, instrument, warn};

use nature_de_pierre_core::ProductId;
use nature_de_pierre_core::catalog::{ActiveToggle, Product, ProductFilter, ProductInput};
use nature_de_pierre_core::pagination::{Page, PageQuery};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::services::uploads::{check_image, store_product_image};
use crate::state::AppState;

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

fn product_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => not_found(),
        RepositoryError::Conflict(msg) => AppError::conflict("PRODUCT_SKU_TAKEN", msg),
        RepositoryError::InUse(msg) => AppError::conflict("PRODUCT_HAS_ORDERS", msg),
        RepositoryError::InvalidReference(msg) => AppError::bad_request("UNKNOWN_CATEGORY", msg),
        other => other.into(),
    }
}

fn not_found() -> AppError {
    AppError::not_found("PRODUCT_NOT_FOUND", "Product not found")
}

/// `GET /api/admin/products` - all products, active or not.
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Product>>> {
    let (items, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(Json(Page::new(items, total, page)))
}

/// `GET /api/admin/products/{id}`
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `POST /api/admin/products`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    input.validate()?;
    let product = ProductRepository::new(state.pool())
        .create(&input.normalized())
        .await
        .map_err(product_error)?;

    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    input.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &input.normalized())
        .await
        .map_err(product_error)?;
    Ok(Json(product))
}

/// `PATCH /api/admin/products/{id}/active`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_active(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
    Json(toggle): Json<ActiveToggle>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .set_active(id, toggle.is_active)
        .await
        .map_err(product_error)?;

    info!(product_id = %id, is_active = toggle.is_active, "Product visibility changed");
    Ok(Json(product))
}

/// `DELETE /api/admin/products/{id}` - refused once the product has been ordered.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(product_error)?;

    info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/products/{id}/image` - multipart upload, field `image`.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<Json<Product>> {
    let products = ProductRepository::new(state.pool());
    if products.get(id).await?.is_none() {
        return Err(not_found());
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await?;
            upload = Some((content_type, bytes));
            break;
        }
    }
    let (content_type, bytes) = upload.ok_or_else(|| {
        AppError::bad_request("MISSING_IMAGE", "Multipart field `image` is required")
    })?;

    let format = check_image(content_type.as_deref(), &bytes)?;
    let uploads = &state.config().uploads;
    let file_name = store_product_image(&uploads.dir, id, format, &bytes).await?;

    match products.set_image_url(id, &uploads.url_for(&file_name)).await {
        Ok(product) => Ok(Json(product)),
        Err(e) => {
            if let Err(io) = tokio::fs::remove_file(uploads.dir.join(&file_name)).await {
                warn!(error = %io, file = %file_name, "Failed to remove orphaned image");
            }
            Err(product_error(e))
        }
    }
}
