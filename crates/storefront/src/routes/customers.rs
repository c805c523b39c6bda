//! Customer route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use nature_de_pierre_core::CustomerId;
use nature_de_pierre_core::customer::{Address, AddressInput, Customer, CustomerInput};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// `POST /api/customers` - look a customer up by email, creating it if absent.
///
/// 201 with the new customer, 200 with the existing one (left unchanged).
#[instrument(skip(state, input))]
pub async fn find_or_create(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> Result<(StatusCode, Json<Customer>)> {
    let new_customer = input.into_new()?;
    let (customer, created) = state.customers().find_or_create(&new_customer).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(customer)))
}

/// `POST /api/customers/{id}/addresses`
#[instrument(skip(state, input))]
pub async fn add_address(
    State(state): State<AppState>,
    Path(id): Path<CustomerId>,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    input.validate()?;
    let address = state
        .customers()
        .save_address(id, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::not_found("CUSTOMER_NOT_FOUND", "Customer not found")
            }
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(address)))
}
