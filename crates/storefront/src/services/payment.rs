//! Payment provider client and webhook signature checks.
//!
//! The provider is an external HTTP service. Opening a session:
//!
//! ```text
//! POST {PAYMENT_SERVICE_URL}/api/payment/create
//! {orderId, reference, amount, currency, customerEmail, returnUrl, cancelUrl}
//! -> {paymentId, paymentUrl, status}
//! ```
//!
//! Webhooks carry `X-Payment-Signature: sha256=<hex>`, the HMAC-SHA256 of the
//! raw request body keyed with `PAYMENT_WEBHOOK_SECRET`.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use nature_de_pierre_core::payment::{PaymentSession, PaymentSessionRequest};

use crate::config::PaymentConfig;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

/// Errors talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed (connection, timeout, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("payment provider returned status {0}")]
    Status(u16),

    /// Provider answered with an unusable payload.
    #[error("invalid payment provider response: {0}")]
    InvalidResponse(String),
}

/// Opens payment sessions with the provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentError>;
}

/// [`PaymentGateway`] backed by the provider's HTTP API.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPaymentGateway {
    /// Create a gateway for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the endpoint
    /// URL cannot be derived from the service URL.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base = config.service_url.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/api/payment/create"))
            .map_err(|e| PaymentError::InvalidResponse(format!("invalid endpoint: {e}")))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, reference = %request.reference))]
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Status(status.as_u16()));
        }

        let session: PaymentSession = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        if session.payment_id.is_empty() || session.payment_url.is_empty() {
            return Err(PaymentError::InvalidResponse(
                "missing paymentId or paymentUrl".to_owned(),
            ));
        }
        Ok(session)
    }
}

/// Compute the signature header value for a body.
#[must_use]
pub fn sign(secret: &SecretString, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Check a webhook signature header against the raw body.
///
/// The comparison runs in constant time.
#[must_use]
pub fn verify_signature(secret: &SecretString, body: &[u8], header: &str) -> bool {
    let Some(provided) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("whsec-test-8f2c1d9e4b7a6350")
    }

    #[test]
    fn test_signature_roundtrip() {
        let body = br#"{"paymentId":"pay_1","status":"succeeded"}"#;
        let header = sign(&secret(), body);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature(&secret(), body, &header));
    }

    #[test]
    fn test_signature_rejects_tampered_body() {
        let header = sign(&secret(), b"original");
        assert!(!verify_signature(&secret(), b"tampered", &header));
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        assert!(!verify_signature(&secret(), b"body", ""));
        assert!(!verify_signature(&secret(), b"body", "md5=abcd"));
        assert!(!verify_signature(&secret(), b"body", "sha256=not-hex"));
    }

    #[test]
    fn test_signature_rejects_other_secret() {
        let header = sign(&SecretString::from("another-secret"), b"body");
        assert!(!verify_signature(&secret(), b"body", &header));
    }
}
