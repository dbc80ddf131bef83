/// HTTP request handlers
use crate::auth::{AuthService, AuthUser};
use crate::domain::{
    AnalysisResult, DailyMeasurement, Health, HourlyMeasurement, LoginRequest, LoginResponse,
    Measurement, NoteRequest, NoteUpdate, WeatherNote, WeatherPrediction,
};
use crate::errors::{ApiError, ApiResult};
use crate::services::{NoteService, TemperatureService, WeatherService};
use crate::utils::parse_day;
use axum::{
    extract::{FromRef, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherService>,
    pub temperature: Arc<TemperatureService>,
    pub notes: Arc<NoteService>,
    pub auth: Arc<AuthService>,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CountQuery {
    pub count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
    pub hours: Option<u32>,
}

fn day_param(raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_day(s)
            .map(Some)
            .ok_or_else(|| ApiError::invalid(format!("invalid date '{}'", s))),
    }
}

fn positive(value: u32, name: &str) -> ApiResult<u32> {
    if value == 0 {
        return Err(ApiError::invalid(format!("{} must be greater than 0", name)));
    }
    Ok(value)
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

pub async fn latest_measurement(State(state): State<AppState>) -> ApiResult<Json<Measurement>> {
    Ok(Json(state.weather.latest().await?))
}

pub async fn recent_measurements(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> ApiResult<Json<Vec<Measurement>>> {
    Ok(Json(state.weather.recent(q.count.unwrap_or(25)).await?))
}

pub async fn hourly_measurements(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Vec<HourlyMeasurement>>> {
    let since = day_param(q.start_date.as_deref())?;
    Ok(Json(state.weather.hourly(since).await?))
}

pub async fn daily_measurements(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Vec<DailyMeasurement>>> {
    let since = day_param(q.start_date.as_deref())?;
    Ok(Json(state.weather.daily(since).await?))
}

pub async fn measurement_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Measurement>> {
    let date = day_param(Some(&date))?.ok_or_else(|| ApiError::invalid("date is required"))?;
    Ok(Json(state.weather.by_date(date).await?))
}

pub async fn latest_prediction(State(state): State<AppState>) -> ApiResult<Json<WeatherPrediction>> {
    Ok(Json(state.weather.latest_prediction().await?))
}

pub async fn recent_predictions(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> ApiResult<Json<Vec<WeatherPrediction>>> {
    Ok(Json(state.weather.recent_predictions(q.count.unwrap_or(10)).await?))
}

/// Trailing-window analysis; failures are reported inside the body.
pub async fn window_analysis(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Json<AnalysisResult>> {
    let days = positive(q.days.unwrap_or(7), "days")?;
    Ok(Json(state.temperature.analyze_window(days).await))
}

pub async fn recent_analysis(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Json<AnalysisResult>> {
    let hours = positive(q.hours.unwrap_or(1), "hours")?;
    Ok(Json(state.temperature.analyze_recent(hours).await))
}

pub async fn note_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<WeatherNote>> {
    let date = day_param(Some(&date))?.ok_or_else(|| ApiError::invalid("date is required"))?;
    Ok(Json(state.notes.by_date(date).await?))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Vec<WeatherNote>>> {
    let start = day_param(q.start_date.as_deref())?;
    let end = day_param(q.end_date.as_deref())?;
    Ok(Json(state.notes.list(start, end).await?))
}

fn note_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::invalid(format!("invalid note id '{}'", raw)))
}

/// 201 with a `Location` pointing at the note's date.
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let note = state.notes.create(&request, &user.user_id).await?;
    let location = format!("/api/notes/{}", note.date.format("%Y-%m-%d"));
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(update): Json<NoteUpdate>,
) -> ApiResult<Json<WeatherNote>> {
    Ok(Json(state.notes.update(note_id(&id)?, &update).await?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.notes.delete(note_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    state
        .auth
        .authenticate(&request)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".into()))
}
