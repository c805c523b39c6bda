//! Redis-backed cart store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use secrecy::{ExposeSecret, SecretString};

use super::store::{CartStore, CartStoreError};

/// Atomic compare-and-set.
///
/// `KEYS[1]` cart key, `ARGV[1]` expected value (empty when the key must be
/// absent), `ARGV[2]` new value, `ARGV[3]` TTL in seconds.
const COMPARE_AND_SWAP: &str = r"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '' then
    if current then
        return 0
    end
elseif current ~= ARGV[1] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
";

/// Atomic compare-and-delete. `KEYS[1]` key, `ARGV[1]` expected value.
const DELETE_IF: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// Cart store on a shared Redis connection.
///
/// `ConnectionManager` reconnects on failure and is cheap to clone.
#[derive(Clone)]
pub struct RedisCartStore {
    conn: ConnectionManager,
    cas: redis::Script,
    delete_if: redis::Script,
}

impl RedisCartStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError::Redis` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &SecretString) -> Result<Self, CartStoreError> {
        let client = redis::Client::open(url.expose_secret())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            cas: redis::Script::new(COMPARE_AND_SWAP),
            delete_if: redis::Script::new(DELETE_IF),
        })
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CartStoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, CartStoreError> {
        let mut conn = self.conn.clone();
        let swapped: i32 = self
            .cas
            .key(key)
            .arg(expected.unwrap_or(""))
            .arg(new)
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn delete(&self, key: &str) -> Result<(), CartStoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, CartStoreError> {
        let mut conn = self.conn.clone();
        let deleted: i32 = self
            .delete_if
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    async fn ping(&self) -> Result<(), CartStoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
