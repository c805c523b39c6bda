//! Database access for the storefront.
//!
//! # Schemas
//!
//! The storefront shares one `PostgreSQL` database with the backoffice:
//!
//! - `catalog` - categories and products (read-only here)
//! - `crm` - customers and their address book
//! - `sales` - orders, order lines and payment intents
//! - `tower_sessions` - session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p nature-de-pierre-cli -- migrate
//! ```

pub mod catalog;
pub mod customers;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::{CategoryRepository, ProductRepository};
pub use customers::{AddressRepository, CustomerRepository};
pub use orders::{OrderRepository, PaymentIntentRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to [`RepositoryError::Conflict`].
    pub(crate) fn unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }

    pub(crate) fn corrupt(what: &str, e: impl std::fmt::Display) -> Self {
        Self::DataCorruption(format!("invalid {what} in database: {e}"))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
