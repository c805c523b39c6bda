//! Nature de Pierre storefront library.
//!
//! Public JSON API behind the storefront UI: catalog reads, the session cart,
//! checkout orchestration and payment callbacks. The router is built here so
//! it can be driven in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::{Span, warn};

use crate::config::StorefrontConfig;
use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// CORS layer for the configured UI origin, if any.
fn cors_layer(config: &StorefrontConfig) -> Option<CorsLayer> {
    let origin = config.cors_origin.as_deref()?;
    let Ok(origin) = HeaderValue::from_str(origin) else {
        warn!(origin, "Ignoring invalid CORS origin");
        return None;
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60)),
    )
}

/// Build the storefront router with its full middleware stack.
///
/// Sessions live in `session_store`; production passes the `PostgreSQL`
/// store, tests an in-memory one.
pub fn build_router<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config();
    let session_layer = create_session_layer(session_store, config);
    let cors = cors_layer(config);

    let mut app = routes::routes(config.rate_limit)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state);

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    // Sentry layers (outermost for full request coverage)
    app.layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
