//! Cart route handlers.
//!
//! The cart belongs to the visitor's session ([`CartOwner`]). Every response
//! carries the whole cart with freshly computed totals.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use nature_de_pierre_core::ProductId;
use nature_de_pierre_core::cart::{Cart, ProductSnapshot};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CartOwner;
use crate::state::AppState;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Body of `PATCH /api/cart/items/{productId}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

fn quantity(raw: i64, min: i64) -> Result<u32> {
    if raw < min {
        return Err(AppError::bad_request(
            "INVALID_QUANTITY",
            format!("quantity must be at least {min}"),
        ));
    }
    u32::try_from(raw)
        .map_err(|_| AppError::bad_request("INVALID_QUANTITY", "quantity is too large"))
}

/// `GET /api/cart`
#[instrument(skip(state, owner))]
pub async fn show(State(state): State<AppState>, owner: CartOwner) -> Result<Json<Cart>> {
    Ok(Json(state.carts().get(owner.as_str()).await?))
}

/// `POST /api/cart/items` - add a product, merging with an existing line.
#[instrument(skip(state, owner))]
pub async fn add_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<Cart>> {
    let quantity = quantity(body.quantity, 1)?;
    let product = state
        .catalog()
        .get_product(body.product_id)
        .await?
        .ok_or_else(|| AppError::not_found("PRODUCT_NOT_FOUND", "Product not found"))?;

    let cart = state
        .carts()
        .add_item(owner.as_str(), ProductSnapshot::from(&product), quantity)
        .await?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(Json(cart))
}

/// `PATCH /api/cart/items/{productId}` - set a quantity; 0 removes the line.
#[instrument(skip(state, owner))]
pub async fn update_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<Cart>> {
    let quantity = quantity(body.quantity, 0)?;
    let cart = state
        .carts()
        .update_quantity(owner.as_str(), product_id, quantity)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/cart/items/{productId}`
#[instrument(skip(state, owner))]
pub async fn remove_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    let cart = state
        .carts()
        .remove_item(owner.as_str(), product_id)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/cart`
#[instrument(skip(state, owner))]
pub async fn clear(State(state): State<AppState>, owner: CartOwner) -> Result<StatusCode> {
    state.carts().clear(owner.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}
