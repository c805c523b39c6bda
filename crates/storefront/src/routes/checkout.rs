//! Checkout route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument, warn};

use nature_de_pierre_core::checkout::{CheckoutRequest, CheckoutResponse, CheckoutStep};

use crate::error::{AppError, Result};
use crate::middleware::CartOwner;
use crate::state::AppState;

/// `POST /api/checkout` - turn the session cart into an order and a payment
/// session. The client redirects to `paymentUrl`.
#[instrument(skip(state, owner, request))]
pub async fn checkout(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let response = state.checkout().checkout(owner.as_str(), &request).await?;

    if let Err(e) = owner.remember_order(response.order_id).await {
        warn!(order_id = %response.order_id, error = %e, "Failed to remember order in session");
    }
    info!(order_id = %response.order_id, reference = %response.reference, "Checkout completed");

    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/checkout/steps/{step}/validate` - validate one wizard step.
///
/// Returns 204 when the step is complete, 400 with field errors otherwise.
#[instrument(skip(request))]
pub async fn validate_step(
    Path(step): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> Result<StatusCode> {
    let step: CheckoutStep = step
        .parse()
        .map_err(|_| AppError::not_found("UNKNOWN_STEP", format!("Unknown checkout step: {step}")))?;
    request.validate_step(step)?;
    Ok(StatusCode::NO_CONTENT)
}
