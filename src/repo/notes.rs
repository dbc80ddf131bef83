use super::{conflict_for_date, NoteRepository};
use crate::domain::WeatherNote;
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type NoteRow = (i64, NaiveDate, String, String, DateTime<Utc>, DateTime<Utc>);

fn to_note((id, date, content, user_id, created_at, updated_at): NoteRow) -> WeatherNote {
    WeatherNote {
        id,
        date,
        content,
        user_id,
        created_at,
        updated_at,
    }
}

/// Postgres note repository; the unique index on `note_date` enforces one note per day
#[derive(Clone)]
pub struct PgNoteRepo {
    pool: PgPool,
}

impl PgNoteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl NoteRepository for PgNoteRepo {
    async fn get_by_date(&self, date: NaiveDate) -> ApiResult<Option<WeatherNote>> {
        let row = sqlx::query_as::<_, NoteRow>(
            "SELECT id, note_date, content, user_id, created_at, updated_at
             FROM weather_notes WHERE note_date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(to_note))
    }

    async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<Vec<WeatherNote>> {
        let rows = sqlx::query_as::<_, NoteRow>(
            "SELECT id, note_date, content, user_id, created_at, updated_at
             FROM weather_notes
             WHERE note_date >= $1 AND note_date <= $2
             ORDER BY note_date ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(to_note).collect())
    }

    async fn create(&self, date: NaiveDate, content: &str, user_id: &str) -> ApiResult<WeatherNote> {
        let result = sqlx::query_as::<_, NoteRow>(
            "INSERT INTO weather_notes(note_date, content, user_id, created_at, updated_at)
             VALUES ($1, $2, $3, now(), now())
             RETURNING id, note_date, content, user_id, created_at, updated_at",
        )
        .bind(date)
        .bind(content)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(to_note(row)),
            Err(e) if is_unique_violation(&e) => Err(conflict_for_date(date)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_content(&self, id: i64, content: &str) -> ApiResult<WeatherNote> {
        let row = sqlx::query_as::<_, NoteRow>(
            "UPDATE weather_notes SET content = $2, updated_at = now()
             WHERE id = $1
             RETURNING id, note_date, content, user_id, created_at, updated_at",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_note)
            .ok_or_else(|| ApiError::not_found(format!("Note with ID {} not found", id)))
    }

    async fn delete(&self, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM weather_notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(format!("Note with ID {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
struct NoteTable {
    next_id: i64,
    by_date: BTreeMap<NaiveDate, WeatherNote>,
}

impl NoteTable {
    fn date_of(&self, id: i64) -> Option<NaiveDate> {
        self.by_date
            .values()
            .find(|note| note.id == id)
            .map(|note| note.date)
    }
}

/// Process-local note repository. Ids are never reused.
#[derive(Default)]
pub struct InMemoryNoteRepo {
    table: RwLock<NoteTable>,
}

impl InMemoryNoteRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepo {
    async fn get_by_date(&self, date: NaiveDate) -> ApiResult<Option<WeatherNote>> {
        Ok(self.table.read().await.by_date.get(&date).cloned())
    }

    async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<Vec<WeatherNote>> {
        if end < start {
            return Ok(Vec::new());
        }
        let table = self.table.read().await;
        Ok(table.by_date.range(start..=end).map(|(_, n)| n.clone()).collect())
    }

    async fn create(&self, date: NaiveDate, content: &str, user_id: &str) -> ApiResult<WeatherNote> {
        let mut table = self.table.write().await;
        if table.by_date.contains_key(&date) {
            return Err(conflict_for_date(date));
        }

        table.next_id += 1;
        let now = Utc::now();
        let note = WeatherNote {
            id: table.next_id,
            date,
            content: content.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        table.by_date.insert(date, note.clone());
        Ok(note)
    }

    async fn update_content(&self, id: i64, content: &str) -> ApiResult<WeatherNote> {
        let mut table = self.table.write().await;
        let date = table
            .date_of(id)
            .ok_or_else(|| ApiError::not_found(format!("Note with ID {} not found", id)))?;

        let note = table
            .by_date
            .get_mut(&date)
            .ok_or_else(|| ApiError::not_found(format!("Note with ID {} not found", id)))?;
        note.content = content.to_string();
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete(&self, id: i64) -> ApiResult<()> {
        let mut table = self.table.write().await;
        let date = table
            .date_of(id)
            .ok_or_else(|| ApiError::not_found(format!("Note with ID {} not found", id)))?;
        table.by_date.remove(&date);
        Ok(())
    }
}
