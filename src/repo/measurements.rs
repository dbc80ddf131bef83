use super::MeasurementStore;
use crate::domain::{
    DailyMeasurement, HourlyMeasurement, Measurement, PredictionData, WeatherPrediction,
};
use crate::errors::ApiResult;
use crate::utils::day_start;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;

type MeasurementRow = (i64, DateTime<Utc>, Option<i64>, Option<Value>, Option<Value>);
type AggregateRow = (i64, DateTime<Utc>, Option<i64>, Value, Option<Value>);
type PredictionRow = (i64, String, String, String, Value, Value, String, f64);

const MEASUREMENT_COLUMNS: &str = "id, timestamp_ms, timestamp_ns, fields, tags";

/// Postgres-backed measurement repository
#[derive(Clone)]
pub struct MeasurementRepo {
    pool: PgPool,
}

impl MeasurementRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn aggregates(&self, table: &str, since: Option<NaiveDate>) -> ApiResult<Vec<AggregateRow>> {
        let rows = sqlx::query_as::<_, AggregateRow>(&format!(
            "SELECT id, timestamp_ms, bucket, fields, tags
             FROM {table}
             WHERE ($1::timestamptz IS NULL OR timestamp_ms >= $1)
             ORDER BY timestamp_ms ASC"
        ))
        .bind(since.map(day_start))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn decode<T: DeserializeOwned>(value: Option<Value>) -> ApiResult<Option<T>> {
    match value {
        Some(Value::Null) | None => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}

fn to_measurement((id, timestamp_ms, timestamp_ns, fields, tags): MeasurementRow) -> ApiResult<Measurement> {
    Ok(Measurement {
        id: Some(id.to_string()),
        timestamp_nanoseconds: timestamp_ns,
        timestamp_ms,
        fields: decode(fields)?,
        tags: decode(tags)?,
    })
}

fn to_prediction(
    (id, date, location, created_at, p12, p24, reasoning, confidence): PredictionRow,
) -> ApiResult<WeatherPrediction> {
    Ok(WeatherPrediction {
        id: Some(id.to_string()),
        date,
        location,
        created_at,
        prediction_12h: serde_json::from_value::<PredictionData>(p12)?,
        prediction_24h: serde_json::from_value::<PredictionData>(p24)?,
        reasoning,
        confidence,
    })
}

#[async_trait]
impl MeasurementStore for MeasurementRepo {
    async fn latest(&self) -> ApiResult<Option<Measurement>> {
        let row = sqlx::query_as::<_, MeasurementRow>(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             ORDER BY timestamp_ms DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_measurement).transpose()
    }

    async fn recent(&self, limit: u32) -> ApiResult<Vec<Measurement>> {
        let rows = sqlx::query_as::<_, MeasurementRow>(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             ORDER BY timestamp_ms DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_measurement).collect()
    }

    async fn hourly(&self, since: Option<NaiveDate>) -> ApiResult<Vec<HourlyMeasurement>> {
        let rows = self.aggregates("hourly_measurements", since).await?;

        rows.into_iter()
            .map(|(id, timestamp_ms, bucket, fields, tags)| {
                Ok(HourlyMeasurement {
                    id: Some(id.to_string()),
                    timestamp: timestamp_ms.timestamp_nanos_opt(),
                    timestamp_ms,
                    hour_timestamp: bucket,
                    fields: serde_json::from_value(fields)?,
                    tags: decode(tags)?,
                })
            })
            .collect()
    }

    async fn daily(&self, since: Option<NaiveDate>) -> ApiResult<Vec<DailyMeasurement>> {
        let rows = self.aggregates("daily_measurements", since).await?;

        rows.into_iter()
            .map(|(id, timestamp_ms, bucket, fields, tags)| {
                Ok(DailyMeasurement {
                    id: Some(id.to_string()),
                    timestamp: timestamp_ms.timestamp_nanos_opt(),
                    timestamp_ms,
                    day_timestamp: bucket,
                    fields: serde_json::from_value(fields)?,
                    tags: decode(tags)?,
                })
            })
            .collect()
    }

    async fn by_date(&self, date: NaiveDate) -> ApiResult<Option<Measurement>> {
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
        let row = sqlx::query_as::<_, MeasurementRow>(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             WHERE timestamp_ms >= $1 AND timestamp_ms < $2
             ORDER BY timestamp_ms DESC LIMIT 1"
        ))
        .bind(day_start(date))
        .bind(day_start(next))
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_measurement).transpose()
    }

    async fn latest_prediction(&self) -> ApiResult<Option<WeatherPrediction>> {
        Ok(self.recent_predictions(1).await?.into_iter().next())
    }

    async fn recent_predictions(&self, count: u32) -> ApiResult<Vec<WeatherPrediction>> {
        let rows = sqlx::query_as::<_, PredictionRow>(
            "SELECT id, date, location, created_at, prediction_12h, prediction_24h, reasoning, confidence
             FROM weather_predictions
             ORDER BY id DESC LIMIT $1",
        )
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_prediction).collect()
    }
}
