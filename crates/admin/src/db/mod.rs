//! Database access for the backoffice.
//!
//! # Schemas
//!
//! The backoffice shares one `PostgreSQL` database with the storefront and
//! owns the write side of it:
//!
//! - `catalog` - categories and products
//! - `crm` - customers and their address book
//! - `sales` - orders (status changes only; orders are placed by the storefront)
//! - `admin` - backoffice accounts
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p nature-de-pierre-cli -- migrate
//! ```

pub mod admin_users;
pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use categories::CategoryRepository;
pub use customers::CustomerRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

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

    /// Unique constraint violation (e.g., duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The row is still referenced and cannot be deleted.
    #[error("still referenced: {0}")]
    InUse(String),

    /// The row references something that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
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

    /// Map a unique violation to [`RepositoryError::Conflict`] and a foreign
    /// key violation to [`RepositoryError::InvalidReference`].
    pub(crate) fn on_write(e: sqlx::Error, duplicate: &str, dangling: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(duplicate.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::InvalidReference(dangling.to_owned());
            }
        }
        Self::Database(e)
    }

    /// Map a foreign key violation raised by a `DELETE` to [`RepositoryError::InUse`].
    pub(crate) fn on_delete(e: sqlx::Error, referenced_by: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return Self::InUse(referenced_by.to_owned());
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
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
