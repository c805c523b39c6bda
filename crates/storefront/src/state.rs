//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cart::{CartService, CartStore};
use crate::config::StorefrontConfig;
use crate::services::{
    Catalog, CheckoutService, CustomerDirectory, OrderLedger, PaymentGateway, PgCatalog,
    PgCustomerDirectory, PgOrderLedger,
};

/// The pluggable backends behind the storefront.
///
/// Production wires the `PostgreSQL` implementations; tests substitute fakes.
#[derive(Clone)]
pub struct Backends {
    pub cart_store: Arc<dyn CartStore>,
    pub catalog: Arc<dyn Catalog>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub orders: Arc<dyn OrderLedger>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl Backends {
    /// `PostgreSQL` backends for the catalog, customers and orders.
    #[must_use]
    pub fn postgres(
        pool: &PgPool,
        cart_store: Arc<dyn CartStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            cart_store,
            catalog: Arc::new(PgCatalog::new(pool.clone())),
            customers: Arc::new(PgCustomerDirectory::new(pool.clone())),
            orders: Arc::new(PgOrderLedger::new(pool.clone())),
            payments,
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    carts: CartService,
    catalog: Arc<dyn Catalog>,
    customers: Arc<dyn CustomerDirectory>,
    orders: Arc<dyn OrderLedger>,
    checkout: CheckoutService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool (readiness checks and sessions)
    /// * `backends` - Cart store, catalog, customers, orders and payment provider
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool, backends: Backends) -> Self {
        let carts = CartService::new(backends.cart_store, config.cart.ttl);
        let checkout = CheckoutService::new(
            carts.clone(),
            Arc::clone(&backends.catalog),
            Arc::clone(&backends.customers),
            Arc::clone(&backends.orders),
            backends.payments,
            config.base_url.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carts,
                catalog: backends.catalog,
                customers: backends.customers,
                orders: backends.orders,
                checkout,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn customers(&self) -> &dyn CustomerDirectory {
        self.inner.customers.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderLedger {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
