use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Date-keyed annotation; at most one per calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherNote {
    pub id: i64,
    #[serde(deserialize_with = "crate::utils::deserialize_day")]
    pub date: NaiveDate,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. A datetime in `date` is truncated to its calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteRequest {
    #[serde(deserialize_with = "crate::utils::deserialize_day")]
    pub date: NaiveDate,
    pub content: String,
}

impl NoteRequest {
    pub fn validate(&self) -> crate::errors::ApiResult<()> {
        if self.content.trim().is_empty() {
            return Err(crate::errors::ApiError::invalid("note content is required"));
        }
        Ok(())
    }
}

/// Update payload. Only the content changes; any `date` sent along is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteUpdate {
    pub content: String,
}
