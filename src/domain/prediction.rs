use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherPrediction {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub date: String,
    pub location: String,
    pub created_at: String,
    pub prediction_12h: PredictionData,
    pub prediction_24h: PredictionData,
    pub reasoning: String,
    pub confidence: f64,
}

impl WeatherPrediction {
    pub fn confidence_percentage(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictionData {
    pub temperature: MinMaxValue,
    pub humidity: MinMaxValue,
    pub pressure: MinMaxValue,
    pub wind_speed: MinMaxValue,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MinMaxValue {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl MinMaxValue {
    /// Stored average, or the midpoint when the producer left it unset.
    pub fn average(&self) -> f64 {
        if self.avg > 0.0 {
            self.avg
        } else {
            (self.min + self.max) / 2.0
        }
    }

    pub fn range(&self) -> String {
        format!("{:.1} - {:.1}", self.min, self.max)
    }
}
