//! Shared in-memory doubles for unit tests.
use crate::cache::DurableCache;
use crate::domain::{
    CacheEntry, DailyMeasurement, HourlyMeasurement, Measurement, WeatherFields,
    WeatherPrediction,
};
use crate::errors::{ApiError, ApiResult};
use crate::repo::MeasurementStore;
use crate::utils::day_start;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

pub fn sample(at: DateTime<Utc>, temperature: f64, pressure: f64) -> Measurement {
    Measurement {
        id: None,
        timestamp_nanoseconds: None,
        timestamp_ms: at,
        fields: Some(WeatherFields {
            temperature,
            pressure,
            ..Default::default()
        }),
        tags: None,
    }
}

#[derive(Default)]
pub struct MemoryDurable {
    pub entries: Mutex<HashMap<String, CacheEntry<Value>>>,
}

#[async_trait]
impl DurableCache for MemoryDurable {
    async fn get(&self, key: &str) -> ApiResult<Option<CacheEntry<Value>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: &CacheEntry<Value>) -> ApiResult<()> {
        self.entries.lock().await.insert(key.to_string(), entry.clone());
        Ok(())
    }
}

/// Measurement store over fixed vectors, counting every call.
#[derive(Default)]
pub struct FakeStore {
    /// Newest first, like the real store.
    pub measurements: Vec<Measurement>,
    pub hourly: Vec<HourlyMeasurement>,
    pub daily: Vec<DailyMeasurement>,
    pub predictions: Vec<WeatherPrediction>,
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ApiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Upstream(503));
        }
        Ok(())
    }
}

#[async_trait]
impl MeasurementStore for FakeStore {
    async fn latest(&self) -> ApiResult<Option<Measurement>> {
        self.enter()?;
        Ok(self.measurements.first().cloned())
    }

    async fn recent(&self, limit: u32) -> ApiResult<Vec<Measurement>> {
        self.enter()?;
        Ok(self.measurements.iter().take(limit as usize).cloned().collect())
    }

    async fn hourly(&self, since: Option<NaiveDate>) -> ApiResult<Vec<HourlyMeasurement>> {
        self.enter()?;
        let floor = since.map(day_start);
        Ok(self
            .hourly
            .iter()
            .filter(|h| floor.map_or(true, |f| h.timestamp_ms >= f))
            .cloned()
            .collect())
    }

    async fn daily(&self, since: Option<NaiveDate>) -> ApiResult<Vec<DailyMeasurement>> {
        self.enter()?;
        let floor = since.map(day_start);
        Ok(self
            .daily
            .iter()
            .filter(|d| floor.map_or(true, |f| d.timestamp_ms >= f))
            .cloned()
            .collect())
    }

    async fn by_date(&self, date: NaiveDate) -> ApiResult<Option<Measurement>> {
        self.enter()?;
        Ok(self
            .measurements
            .iter()
            .find(|m| m.timestamp_ms.date_naive() == date)
            .cloned())
    }

    async fn latest_prediction(&self) -> ApiResult<Option<WeatherPrediction>> {
        self.enter()?;
        Ok(self.predictions.first().cloned())
    }

    async fn recent_predictions(&self, count: u32) -> ApiResult<Vec<WeatherPrediction>> {
        self.enter()?;
        Ok(self.predictions.iter().take(count as usize).cloned().collect())
    }
}
