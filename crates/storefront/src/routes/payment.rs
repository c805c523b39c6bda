//! Payment route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use nature_de_pierre_core::payment::{
    CreatePaymentRequest, PaymentEvent, PaymentEventOutcome, PaymentIntent,
};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::CartOwner;
use crate::services::payment::{SIGNATURE_HEADER, verify_signature};
use crate::state::AppState;

/// `POST /api/payment/create` - open a new payment session for an unpaid
/// order placed from this session.
#[instrument(skip(state, owner))]
pub async fn create(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentIntent>)> {
    if !owner.placed(body.order_id).await? {
        return Err(AppError::not_found("ORDER_NOT_FOUND", "Order not found"));
    }
    let intent = state.checkout().create_payment(body.order_id).await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub outcome: PaymentEventOutcome,
}

/// `POST /api/payment/webhook` - payment provider callback.
///
/// The raw body must be signed; see [`verify_signature`].
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&state.config().payment.webhook_secret, &body, signature) {
        warn!("Rejected payment webhook with invalid signature");
        return Err(AppError::Unauthorized("invalid signature".to_owned()));
    }

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request("INVALID_PAYLOAD", e.to_string()))?;

    let outcome = state
        .orders()
        .apply_payment_event(&event)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::not_found("PAYMENT_NOT_FOUND", "Unknown payment")
            }
            other => other.into(),
        })?;

    info!(payment_id = %event.payment_id, status = %event.status, ?outcome, "Payment event processed");
    Ok(Json(WebhookAck { outcome }))
}
