use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived window statistics. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub highest_temperature: f64,
    pub lowest_temperature: f64,
    pub average_temperature: f64,
    /// Positive means warming
    pub temperature_trend: f64,

    pub highest_pressure: f64,
    pub lowest_pressure: f64,
    pub average_pressure: f64,
    /// Positive means rising
    pub pressure_trend: f64,

    pub total_rainfall: f64,
    pub rainy_days_count: usize,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    pub hourly_temperatures: Vec<TemperatureDataPoint>,
    pub hourly_pressures: Vec<DataPoint>,

    /// Average minutes between samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_count: Option<usize>,
}

impl AnalysisResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemperatureDataPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}
