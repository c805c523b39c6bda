//! Cart storage backends.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a cart store.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cart store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value storage for serialized carts.
///
/// Values are opaque strings. Writes go through [`CartStore::compare_and_swap`]
/// so that two concurrent read-modify-write cycles on one cart cannot
/// overwrite each other.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Read the raw value stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<String>, CartStoreError>;

    /// Store `new` under `key` only if the current value is still `expected`.
    ///
    /// `expected = None` means the key must not exist. The TTL is reset on
    /// every successful write. Returns `false` when another writer got there
    /// first.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, CartStoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CartStoreError>;

    /// Remove `key` only if it still holds `expected`.
    ///
    /// Returns `false` and leaves the value in place when it changed.
    async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, CartStoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), CartStoreError>;
}
