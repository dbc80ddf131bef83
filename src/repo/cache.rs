use crate::cache::DurableCache;
use crate::domain::CacheEntry;
use crate::errors::ApiResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

/// Durable response cache stored in Postgres
#[derive(Clone)]
pub struct CacheRepo {
    pool: PgPool,
}

impl CacheRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableCache for CacheRepo {
    async fn get(&self, key: &str) -> ApiResult<Option<CacheEntry<Value>>> {
        let row = sqlx::query_as::<_, (DateTime<Utc>, Value)>(
            "SELECT fetched_at, payload FROM response_cache WHERE cache_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(fetched_at, payload)| CacheEntry {
            payload,
            fetched_at,
        }))
    }

    async fn put(&self, key: &str, entry: &CacheEntry<Value>) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO response_cache(cache_key, fetched_at, payload)
             VALUES ($1, $2, $3)
             ON CONFLICT (cache_key) DO UPDATE
             SET fetched_at = EXCLUDED.fetched_at, payload = EXCLUDED.payload",
        )
        .bind(key)
        .bind(entry.fetched_at)
        .bind(&entry.payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
