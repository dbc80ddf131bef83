use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw station reading. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    #[serde(default)]
    pub id: Option<String>,
    /// Legacy nanosecond timestamp kept by older documents
    #[serde(default)]
    pub timestamp_nanoseconds: Option<i64>,
    pub timestamp_ms: DateTime<Utc>,
    #[serde(default)]
    pub fields: Option<WeatherFields>,
    #[serde(default)]
    pub tags: Option<WeatherTags>,
}

impl Measurement {
    pub fn temperature(&self) -> f64 {
        self.fields.as_ref().map_or(0.0, |f| f.temperature)
    }

    pub fn pressure(&self) -> f64 {
        self.fields.as_ref().map_or(0.0, |f| f.pressure)
    }

    pub fn rain(&self) -> f64 {
        self.fields.as_ref().map_or(0.0, |f| f.rain)
    }
}

/// Accepts both the API's camelCase names and the ingestion pipeline's snake_case ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherFields {
    #[serde(alias = "device_temperature")]
    pub device_temperature: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub dewpoint: f64,
    pub lux: f64,
    pub pressure: f64,
    #[serde(alias = "wind_speed")]
    pub wind_speed: f64,
    pub rain: f64,
    #[serde(alias = "wind_direction")]
    pub wind_direction: f64,
    #[serde(alias = "wind_direction_cardinal")]
    pub wind_direction_cardinal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherTags {
    pub location: Option<String>,
    #[serde(alias = "sensor_type")]
    pub sensor_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemperatureStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AverageStats {
    pub avg: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindStats {
    pub avg: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RainStats {
    pub sum: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HourlyFields {
    pub temperature: TemperatureStats,
    pub humidity: AverageStats,
    pub pressure: AverageStats,
    pub wind_speed: WindStats,
    pub lux: AverageStats,
    pub sample_count: i64,
}

/// One-hour rollup produced by the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyMeasurement {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub timestamp_ms: DateTime<Utc>,
    #[serde(default)]
    pub hour_timestamp: Option<i64>,
    #[serde(default)]
    pub fields: HourlyFields,
    #[serde(default)]
    pub tags: Option<WeatherTags>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DailyFields {
    pub temperature: TemperatureStats,
    pub humidity: AverageStats,
    pub pressure: AverageStats,
    pub wind_speed: WindStats,
    pub lux: AverageStats,
    pub rain: RainStats,
    pub sample_count: i64,
}

/// One-day rollup produced by the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMeasurement {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub timestamp_ms: DateTime<Utc>,
    #[serde(default)]
    pub day_timestamp: Option<i64>,
    #[serde(default)]
    pub fields: DailyFields,
    #[serde(default)]
    pub tags: Option<WeatherTags>,
}
