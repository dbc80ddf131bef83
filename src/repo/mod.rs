/// Repository layer: storage traits and their Postgres / in-memory implementations
mod cache;
mod measurements;
mod notes;
mod users;

pub use cache::CacheRepo;
pub use measurements::MeasurementRepo;
pub use notes::{InMemoryNoteRepo, PgNoteRepo};
pub use users::InMemoryUserRepo;

use crate::domain::{
    DailyMeasurement, HourlyMeasurement, Measurement, User, WeatherNote, WeatherPrediction,
};
use crate::errors::ApiResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

/// Read side of the measurement collections. Written by the ingestion pipeline.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    async fn latest(&self) -> ApiResult<Option<Measurement>>;

    /// Newest first.
    async fn recent(&self, limit: u32) -> ApiResult<Vec<Measurement>>;

    /// Oldest first; `None` means no lower bound.
    async fn hourly(&self, since: Option<NaiveDate>) -> ApiResult<Vec<HourlyMeasurement>>;

    /// Oldest first; `None` means no lower bound.
    async fn daily(&self, since: Option<NaiveDate>) -> ApiResult<Vec<DailyMeasurement>>;

    /// Newest reading taken on `date`.
    async fn by_date(&self, date: NaiveDate) -> ApiResult<Option<Measurement>>;

    async fn latest_prediction(&self) -> ApiResult<Option<WeatherPrediction>>;

    async fn recent_predictions(&self, count: u32) -> ApiResult<Vec<WeatherPrediction>>;
}

/// Date-keyed notes, at most one per calendar day.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn get_by_date(&self, date: NaiveDate) -> ApiResult<Option<WeatherNote>>;

    /// Inclusive on both ends, ascending by date.
    async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<Vec<WeatherNote>>;

    /// Fails with `Conflict` when `date` already has a note.
    async fn create(&self, date: NaiveDate, content: &str, user_id: &str) -> ApiResult<WeatherNote>;

    /// Replaces the content only. Fails with `NotFound` for an unknown id.
    async fn update_content(&self, id: i64, content: &str) -> ApiResult<WeatherNote>;

    /// Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: i64) -> ApiResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Case-insensitive match.
    async fn get_by_username(&self, username: &str) -> ApiResult<Option<User>>;

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> ApiResult<()>;
}

pub(crate) fn conflict_for_date(date: NaiveDate) -> crate::errors::ApiError {
    crate::errors::ApiError::Conflict(format!(
        "Note already exists for date {}",
        date.format("%Y-%m-%d")
    ))
}

/// Initialize database tables
pub async fn init_db(pool: &PgPool) -> ApiResult<()> {
    // Raw readings
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS measurements(
            id BIGSERIAL PRIMARY KEY,
            timestamp_ms TIMESTAMPTZ NOT NULL,
            timestamp_ns BIGINT,
            fields JSONB,
            tags JSONB
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS ix_measurements_ts
         ON measurements(timestamp_ms DESC)",
    )
    .execute(pool)
    .await?;

    // Aggregates
    for table in ["hourly_measurements", "daily_measurements"] {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table}(
                id BIGSERIAL PRIMARY KEY,
                timestamp_ms TIMESTAMPTZ NOT NULL,
                bucket BIGINT,
                fields JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                tags JSONB
            )"
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS ix_{table}_ts ON {table}(timestamp_ms)"
        ))
        .execute(pool)
        .await?;
    }

    // Predictions
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS weather_predictions(
            id BIGSERIAL PRIMARY KEY,
            date TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT '',
            prediction_12h JSONB NOT NULL DEFAULT '{}'::jsonb,
            prediction_24h JSONB NOT NULL DEFAULT '{}'::jsonb,
            reasoning TEXT NOT NULL DEFAULT '',
            confidence DOUBLE PRECISION NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    // Durable response cache
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS response_cache(
            cache_key TEXT PRIMARY KEY,
            fetched_at TIMESTAMPTZ NOT NULL,
            payload JSONB NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // Notes
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS weather_notes(
            id BIGSERIAL PRIMARY KEY,
            note_date DATE NOT NULL,
            content TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_weather_notes_date
         ON weather_notes(note_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
