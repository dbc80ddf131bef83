/// Domain models for the application
mod analysis;
mod measurement;
mod note;
mod prediction;
mod user;

pub use analysis::{AnalysisResult, DataPoint, TemperatureDataPoint};
pub use measurement::{
    AverageStats, DailyFields, DailyMeasurement, HourlyFields, HourlyMeasurement, Measurement,
    RainStats, TemperatureStats, WeatherFields, WeatherTags, WindStats,
};
pub use note::{NoteRequest, NoteUpdate, WeatherNote};
pub use prediction::{MinMaxValue, PredictionData, WeatherPrediction};
pub use user::{LoginRequest, LoginResponse, User};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display conversion, never stored.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    32.0 + celsius * 9.0 / 5.0
}

/// Cached payload and the instant it was fetched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            fetched_at: Utc::now(),
        }
    }

    /// True while the entry is younger than `ttl` at `now`.
    pub fn is_fresh(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.fetched_at < ttl,
            Err(_) => true,
        }
    }
}

/// Outcome of a single-resource lookup that keeps "absent" apart from "failed"
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Error(String),
}

impl<T> Lookup<T> {
    pub fn from_result(result: crate::errors::ApiResult<T>) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(crate::errors::ApiError::NotFound(_)) => Lookup::NotFound,
            Err(e) => Lookup::Error(e.to_string()),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
