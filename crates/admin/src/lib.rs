//! Nature de Pierre backoffice library.
//!
//! JSON API behind the backoffice UI: catalog, customer and order
//! management with bearer token authentication. The router is built here so
//! it can be driven in-process by tests.
//!
//! # Security
//!
//! Writes are restricted to the `admin` role; `viewer` accounts are
//! read-only. Bind to a private interface and expose through the reverse
//! proxy that serves the backoffice UI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::http::{
    HeaderName, HeaderValue, Method,
    header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::{Span, warn};

use crate::config::AdminConfig;
use crate::state::AppState;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// CORS layer for the configured backoffice origin, if any.
fn cors_layer(config: &AdminConfig) -> Option<CorsLayer> {
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
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .expose_headers([REQUEST_ID_HEADER])
            .max_age(Duration::from_secs(60 * 60)),
    )
}

/// Build the admin router with its full middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(config);
    let uploads = ServeDir::new(config.uploads.dir.clone());
    let rate_limit = config.rate_limit;

    let mut app = routes::routes(rate_limit)
        .with_state(state)
        .nest_service("/uploads", uploads)
        // Security headers
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(&REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    sentry::configure_scope(|scope| scope.set_tag("request_id", request_id));
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
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
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid));

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    // Sentry layers (outermost for full request coverage)
    app.layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
