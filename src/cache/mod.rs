/// Two-tier response cache: an in-process map in front of a durable key-value layer.
///
/// Entries are whole JSON payloads stamped with their fetch time and are
/// never patched in place. Nothing is evicted; a stale entry is skipped and
/// overwritten by the next successful fetch.
mod file;

pub use file::FileCache;

use crate::domain::CacheEntry;
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Fixed per-endpoint freshness policy
pub mod ttl {
    use std::time::Duration;

    pub const LATEST: Duration = Duration::from_secs(15 * 60);
    pub const RECENT: Duration = Duration::from_secs(30 * 60);
    pub const HOURLY: Duration = Duration::from_secs(45 * 60);
    pub const DAILY: Duration = Duration::from_secs(60 * 60);
    pub const PREDICTIONS: Duration = Duration::from_secs(60 * 60);
}

/// Cache keys; every parameter that changes the answer is part of the key.
pub mod keys {
    pub const LATEST_MEASUREMENT: &str = "latest_measurement";
    pub const LATEST_PREDICTION: &str = "latest_prediction";

    pub fn recent(count: u32) -> String {
        format!("recent_measurements_{}", count)
    }

    pub fn hourly(days: u32) -> String {
        format!("hourly_measurements_{}", days)
    }

    pub fn daily(days: u32) -> String {
        format!("daily_measurements_{}", days)
    }

    pub fn predictions(count: u32) -> String {
        format!("recent_predictions_{}", count)
    }
}

/// Durable side of the cache. Failures here are never fatal to a lookup.
#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn get(&self, key: &str) -> ApiResult<Option<CacheEntry<Value>>>;
    async fn put(&self, key: &str, entry: &CacheEntry<Value>) -> ApiResult<()>;
}

pub struct ResultCache {
    memory: RwLock<HashMap<String, CacheEntry<Value>>>,
    durable: Arc<dyn DurableCache>,
    fetch_timeout: Duration,
}

impl ResultCache {
    pub fn new(durable: Arc<dyn DurableCache>, fetch_timeout: Duration) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            durable,
            fetch_timeout,
        }
    }

    /// Serve `key` from memory, then the durable layer, then `fetch`.
    ///
    /// Only successful, non-empty results are written back. A fetch that
    /// outlives the configured deadline fails with [`ApiError::Timeout`].
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let now = Utc::now();

        if let Some(payload) = self.memory_hit(key, ttl, now).await {
            match serde_json::from_value(payload) {
                Ok(value) => {
                    debug!("cache hit (memory) for {}", key);
                    return Ok(value);
                }
                Err(e) => warn!("discarding undecodable cache entry {}: {}", key, e),
            }
        }

        match self.durable.get(key).await {
            Ok(Some(entry)) if entry.is_fresh(ttl, now) => {
                match serde_json::from_value(entry.payload.clone()) {
                    Ok(value) => {
                        debug!("cache hit (durable) for {}", key);
                        self.memory.write().await.insert(key.to_string(), entry);
                        return Ok(value);
                    }
                    Err(e) => warn!("discarding undecodable durable entry {}: {}", key, e),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("durable cache read failed for {}: {}", key, e),
        }

        debug!("cache miss for {}", key);
        let value = match tokio::time::timeout(self.fetch_timeout, fetch()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ApiError::Timeout(format!(
                    "fetching {} took longer than {:?}",
                    key, self.fetch_timeout
                )))
            }
        };

        match serde_json::to_value(&value) {
            Ok(payload) if is_cacheable(&payload) => {
                let entry = CacheEntry::new(payload);
                if let Err(e) = self.durable.put(key, &entry).await {
                    warn!("durable cache write failed for {}: {}", key, e);
                }
                self.memory.write().await.insert(key.to_string(), entry);
            }
            Ok(_) => debug!("not caching empty result for {}", key),
            Err(e) => warn!("could not serialize result for {}: {}", key, e),
        }

        Ok(value)
    }

    async fn memory_hit(&self, key: &str, ttl: Duration, now: chrono::DateTime<Utc>) -> Option<Value> {
        let memory = self.memory.read().await;
        memory
            .get(key)
            .filter(|entry| entry.is_fresh(ttl, now))
            .map(|entry| entry.payload.clone())
    }
}

fn is_cacheable(payload: &Value) -> bool {
    match payload {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
