//! Read cache for record snapshots.
//!
//! Cached values are typed per record: a cache handle only ever stores and
//! yields one record type, so a wrong-type read cannot happen at runtime.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::error::AppError;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Snapshots expire after a fixed day regardless of record state.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub fn payment_cache_key(id: Uuid) -> String {
    format!("payment:{}", id)
}

pub fn subscription_cache_key(id: Uuid) -> String {
    format!("subscription:{}", id)
}

/// Non-authoritative keyed snapshot store with per-entry TTL.
#[async_trait]
pub trait RecordCache<T>: Send + Sync {
    async fn set(&self, key: &str, value: &T, ttl: Duration) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Option<T>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Redis-backed cache storing records as JSON.
pub struct RedisCache<T> {
    client: redis::Client,
    _record: PhantomData<fn() -> T>,
}

impl<T> RedisCache<T> {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl<T> RecordCache<T> for RedisCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn set(&self, key: &str, value: &T, ttl: Duration) -> Result<(), AppError> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| AppError::CacheError(anyhow::Error::new(e)))?;
        let mut con = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<T>, AppError> {
        let mut con = self.connection().await?;
        let payload: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut con).await?;
        match payload {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::CacheError(anyhow::Error::new(e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut con = self.connection().await?;
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut con).await?;
        Ok(())
    }
}

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// In-process cache with the same contract as the Redis adapter. Used by
/// integration tests and local development without a cache server.
pub struct InMemoryCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
}

impl<T> InMemoryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T> Default for InMemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> RecordCache<T> for InMemoryCache<T>
where
    T: Clone + Send + Sync,
{
    async fn set(&self, key: &str, value: &T, ttl: Duration) -> Result<(), AppError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<T>, AppError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Lazily drop the expired entry.
        self.entries.remove(key);
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Cache that fails every call. Exercises the best-effort paths in tests.
pub struct FailingCache;

#[async_trait]
impl<T> RecordCache<T> for FailingCache
where
    T: Send + Sync,
{
    async fn set(&self, _key: &str, _value: &T, _ttl: Duration) -> Result<(), AppError> {
        Err(AppError::CacheError(anyhow::anyhow!("cache unavailable")))
    }

    async fn get(&self, _key: &str) -> Result<Option<T>, AppError> {
        Err(AppError::CacheError(anyhow::anyhow!("cache unavailable")))
    }

    async fn delete(&self, _key: &str) -> Result<(), AppError> {
        Err(AppError::CacheError(anyhow::anyhow!("cache unavailable")))
    }
}
