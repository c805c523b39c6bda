//! In-process cart store for tests and local development.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::store::{CartStore, CartStoreError};

/// Cart store backed by a `HashMap`. Carts vanish on restart.
#[derive(Default)]
pub struct MemoryCartStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, (String, Instant)>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        f(&mut entries)
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CartStoreError> {
        Ok(self.with_entries(|entries| entries.get(key).map(|(value, _)| value.clone())))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, CartStoreError> {
        Ok(self.with_entries(|entries| {
            let current = entries.get(key).map(|(value, _)| value.as_str());
            if current != expected {
                return false;
            }
            entries.insert(key.to_owned(), (new.to_owned(), Instant::now() + ttl));
            true
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), CartStoreError> {
        self.with_entries(|entries| entries.remove(key));
        Ok(())
    }

    async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, CartStoreError> {
        Ok(self.with_entries(|entries| {
            if entries.get(key).map(|(value, _)| value.as_str()) != Some(expected) {
                return false;
            }
            entries.remove(key);
            true
        }))
    }

    async fn ping(&self) -> Result<(), CartStoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_cas_requires_absent_key_for_none() {
        let store = MemoryCartStore::new();
        assert!(store.compare_and_swap("k", None, "v1", TTL).await.unwrap());
        assert!(!store.compare_and_swap("k", None, "v2", TTL).await.unwrap());
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_expected() {
        let store = MemoryCartStore::new();
        store.compare_and_swap("k", None, "v1", TTL).await.unwrap();
        assert!(store.compare_and_swap("k", Some("v1"), "v2", TTL).await.unwrap());
        assert!(!store.compare_and_swap("k", Some("v1"), "v3", TTL).await.unwrap());
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryCartStore::new();
        store
            .compare_and_swap("k", None, "v1", Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.load("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_if_only_removes_expected_value() {
        let store = MemoryCartStore::new();
        store.compare_and_swap("k", None, "v1", TTL).await.unwrap();
        assert!(!store.delete_if("k", "v0").await.unwrap());
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("v1"));
        assert!(store.delete_if("k", "v1").await.unwrap());
        assert_eq!(store.load("k").await.unwrap(), None);
        assert!(!store.delete_if("k", "v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_key() {
        let store = MemoryCartStore::new();
        store.delete("nope").await.unwrap();
    }
}
