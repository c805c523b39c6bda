//! Rate limiting for the login endpoint using governor and `tower_governor`.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for login attempts: one token every 12 seconds per IP
/// (~5 per minute), with a burst of 5.
///
/// The client IP comes from `X-Forwarded-For`, `X-Real-IP` or `Forwarded`
/// when present, else from the peer address.
///
/// Returns `None` if governor rejects the configuration.
#[must_use]
pub fn login_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(12)
        .burst_size(5)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}
