//! Nature de Pierre storefront API.
//!
//! Serves the public JSON API on port 3000: catalog, session cart, checkout
//! and payment callbacks.
//!
//! # Backends
//!
//! - `PostgreSQL` for the catalog, customers, orders and sessions
//! - Redis for carts (`STOREFRONT_CART_BACKEND=memory` for local development)
//! - The payment provider over HTTP

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nature_de_pierre_storefront::build_router;
use nature_de_pierre_storefront::cart::{CartStore, MemoryCartStore, RedisCartStore};
use nature_de_pierre_storefront::config::{CartBackend, StorefrontConfig};
use nature_de_pierre_storefront::db;
use nature_de_pierre_storefront::services::HttpPaymentGateway;
use nature_de_pierre_storefront::state::{AppState, Backends};

/// How often expired sessions are purged.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &StorefrontConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nature_de_pierre_storefront=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn connect_cart_store(config: &StorefrontConfig) -> Result<Arc<dyn CartStore>, Box<dyn Error>> {
    match (config.cart.backend, &config.cart.redis_url) {
        (CartBackend::Redis, Some(url)) => {
            let store = RedisCartStore::connect(url).await?;
            tracing::info!("Redis cart store connected");
            Ok(Arc::new(store))
        }
        (CartBackend::Redis, None) => Err("STOREFRONT_REDIS_URL is required for the redis cart backend".into()),
        (CartBackend::Memory, _) => {
            tracing::warn!("Using in-memory cart store; carts are lost on restart");
            Ok(Arc::new(MemoryCartStore::new()))
        }
    }
}

async fn run(config: StorefrontConfig) -> Result<(), Box<dyn Error>> {
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // NOTE: Schema migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p nature-de-pierre-cli -- migrate
    let session_store = PostgresStore::new(pool.clone());
    session_store.migrate().await?;
    tokio::spawn(
        session_store
            .clone()
            .continuously_delete_expired(SESSION_CLEANUP_INTERVAL),
    );

    let cart_store = connect_cart_store(&config).await?;
    let payments = Arc::new(HttpPaymentGateway::new(&config.payment)?);
    let backends = Backends::postgres(&pool, cart_store, payments);

    let addr = config.socket_addr();
    let state = AppState::new(config, pool, backends);
    let app = build_router(state, session_store);

    tracing::info!("storefront listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Storefront failed");
            ExitCode::FAILURE
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
