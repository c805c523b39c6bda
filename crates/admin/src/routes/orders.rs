//! Order browsing and manual status changes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{info, instrument};

use nature_de_pierre_core::OrderId;
use nature_de_pierre_core::order::{Order, OrderFilter, OrderStatusUpdate, OrderSummary};
use nature_de_pierre_core::pagination::{Page, PageQuery};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

/// `GET /api/admin/orders?status=&customerId=&page=&perPage=`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<OrderFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let (items, total) = OrderRepository::new(state.pool())
        .list(filter, page)
        .await?;
    Ok(Json(Page::new(items, total, page)))
}

/// `GET /api/admin/orders/{id}` - the order with its lines.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("ORDER_NOT_FOUND", "Order not found"))
}

/// `PATCH /api/admin/orders/{id}/status`
///
/// Only cancellation and shipping are manual; payment outcomes arrive
/// through the storefront webhook.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<OrderId>,
    Json(update): Json<OrderStatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, update)
        .await?;

    info!(order_id = %id, reference = %order.reference, status = %order.status, "Order status changed");
    Ok(Json(order))
}
