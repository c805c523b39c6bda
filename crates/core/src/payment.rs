//! Payment intents and provider payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, OrderId, PaymentIntentId, PaymentStatus};

/// A payment session opened with the provider for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    pub order_id: OrderId,
    pub provider_payment_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub payment_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request sent to the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionRequest {
    pub order_id: OrderId,
    pub reference: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    pub customer_email: String,
    pub return_url: String,
    pub cancel_url: String,
}

/// Provider answer to [`PaymentSessionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub payment_id: String,
    pub payment_url: String,
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Webhook payload pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub payment_id: String,
    pub status: PaymentStatus,
}

/// Body of `POST /api/payment/create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
}

/// What applying a [`PaymentEvent`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventOutcome {
    /// Intent and order were updated.
    Applied,
    /// The intent was already final; nothing changed.
    AlreadyFinal,
    /// `pending` events carry no state change.
    Ignored,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_defaults_to_pending() {
        let session: PaymentSession =
            serde_json::from_str(r#"{"paymentId":"pay_1","paymentUrl":"https://pay/1"}"#)
                .unwrap();
        assert_eq!(session.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_event_parses_status() {
        let event: PaymentEvent =
            serde_json::from_str(r#"{"paymentId":"pay_1","status":"succeeded"}"#).unwrap();
        assert_eq!(event.status, PaymentStatus::Succeeded);
        assert!(serde_json::from_str::<PaymentEvent>(r#"{"paymentId":"x","status":"?"}"#).is_err());
    }
}
