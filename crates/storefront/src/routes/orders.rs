//! Order confirmation.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use nature_de_pierre_core::OrderId;
use nature_de_pierre_core::order::Order;

use crate::error::{AppError, Result};
use crate::middleware::CartOwner;
use crate::state::AppState;

/// `GET /api/orders/{id}` - only orders placed from the current session are
/// visible; any other id reads as not found.
#[instrument(skip(state, owner))]
pub async fn show(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let not_found = || AppError::not_found("ORDER_NOT_FOUND", "Order not found");
    if !owner.placed(id).await? {
        return Err(not_found());
    }
    state.orders().get_order(id).await?.map(Json).ok_or_else(not_found)
}
