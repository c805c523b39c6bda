//! Customer management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use nature_de_pierre_core::CustomerId;
use nature_de_pierre_core::customer::{Address, Customer, CustomerInput};
use nature_de_pierre_core::pagination::{Page, PageQuery};

use crate::db::{CustomerRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

/// `?search=` for the customer list.
#[derive(Debug, Deserialize, Default)]
pub struct CustomerSearch {
    pub search: Option<String>,
}

fn customer_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => not_found(),
        RepositoryError::Conflict(msg) => AppError::conflict("CUSTOMER_EMAIL_TAKEN", msg),
        RepositoryError::InUse(msg) => AppError::conflict("CUSTOMER_HAS_ORDERS", msg),
        other => other.into(),
    }
}

fn not_found() -> AppError {
    AppError::not_found("CUSTOMER_NOT_FOUND", "Customer not found")
}

/// `GET /api/admin/customers?search=&page=&perPage=`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<CustomerSearch>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Customer>>> {
    let (items, total) = CustomerRepository::new(state.pool())
        .list(query.search.as_deref(), page)
        .await?;
    Ok(Json(Page::new(items, total, page)))
}

/// `GET /api/admin/customers/{id}`
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CustomerId>,
) -> Result<Json<Customer>> {
    CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `POST /api/admin/customers`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<CustomerInput>,
) -> Result<(StatusCode, Json<Customer>)> {
    let customer = CustomerRepository::new(state.pool())
        .create(&input.into_new()?)
        .await
        .map_err(customer_error)?;

    info!(customer_id = %customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `PUT /api/admin/customers/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<CustomerId>,
    Json(input): Json<CustomerInput>,
) -> Result<Json<Customer>> {
    let customer = CustomerRepository::new(state.pool())
        .update(id, &input.into_new()?)
        .await
        .map_err(customer_error)?;
    Ok(Json(customer))
}

/// `DELETE /api/admin/customers/{id}` - refused once the customer has ordered.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode> {
    CustomerRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(customer_error)?;

    info!(customer_id = %id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/customers/{id}/addresses`
#[instrument(skip(state, _admin))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<Address>>> {
    let customers = CustomerRepository::new(state.pool());
    if customers.get(id).await?.is_none() {
        return Err(not_found());
    }
    Ok(Json(customers.addresses(id).await?))
}
