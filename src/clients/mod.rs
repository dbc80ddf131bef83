/// REST API client for the station service
use crate::domain::{
    DailyMeasurement, HourlyMeasurement, LoginRequest, LoginResponse, Lookup, Measurement,
    NoteRequest, NoteUpdate, WeatherNote, WeatherPrediction,
};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::repo::MeasurementStore;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("weather-station-client/1.0")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Session credential, optionally persisted to a JSON file between runs
pub struct CredentialHolder {
    current: RwLock<Option<LoginResponse>>,
    path: Option<PathBuf>,
}

impl CredentialHolder {
    /// Memory-only holder.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            path: None,
        }
    }

    /// Holder backed by `path`, loading any credential saved there.
    pub async fn persisted(path: impl Into<PathBuf>) -> ApiResult<Self> {
        let path = path.into();
        let current = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            current: RwLock::new(current),
            path: Some(path),
        })
    }

    pub async fn set(&self, credential: LoginResponse) -> ApiResult<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, serde_json::to_vec_pretty(&credential)?).await?;
        }
        *self.current.write().await = Some(credential);
        Ok(())
    }

    pub async fn clear(&self) -> ApiResult<()> {
        *self.current.write().await = None;
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Token present and not yet expired.
    pub async fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.expiration > Utc::now())
    }

    pub async fn username(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|c| c.username.clone())
    }

    /// Adds `Authorization: Bearer` when a live credential is held.
    pub async fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        match self.current.read().await.as_ref() {
            Some(c) if c.expiration > Utc::now() => request.bearer_auth(&c.token),
            _ => request,
        }
    }
}

impl Default for CredentialHolder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the station REST API
pub struct StationClient {
    http_client: HttpClient,
    base_url: Url,
    credentials: Arc<CredentialHolder>,
}

impl StationClient {
    pub fn new(base_url: &str, timeout: Duration, credentials: Arc<CredentialHolder>) -> ApiResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::invalid(format!("bad API url '{}': {}", base_url, e)))?;
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Arc<CredentialHolder> {
        &self.credentials
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::invalid(format!("bad endpoint '{}': {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let response = self
            .http_client
            .get_client()
            .get(url)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// GET where 404 means "nothing there" rather than failure.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Option<T>> {
        match self.get_json(path, &[]).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Exchange a username and password for a bearer credential and keep it.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let response = self
            .http_client
            .get_client()
            .post(self.url("api/auth/login")?)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let credential: LoginResponse = match handle_response(response).await {
            Err(ApiError::Unauthorized(_)) => {
                return Err(ApiError::Unauthorized("Invalid username or password".into()))
            }
            other => other?,
        };
        self.credentials.set(credential.clone()).await?;
        info!(user = %credential.username, "logged in");
        Ok(credential)
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.credentials.clear().await
    }

    pub async fn note_by_date(&self, date: NaiveDate) -> Lookup<WeatherNote> {
        Lookup::from_result(self.get_json(&format!("api/notes/{}", date), &[]).await)
    }

    pub async fn measurement_by_date(&self, date: NaiveDate) -> Lookup<Measurement> {
        Lookup::from_result(self.get_json(&format!("api/weather/date/{}", date), &[]).await)
    }

    pub async fn notes_in_range(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<Vec<WeatherNote>> {
        self.get_json(
            "api/notes",
            &[("startDate", start.to_string()), ("endDate", end.to_string())],
        )
        .await
    }

    pub async fn create_note(&self, request: &NoteRequest) -> ApiResult<WeatherNote> {
        let builder = self
            .http_client
            .get_client()
            .post(self.url("api/notes")?)
            .json(request);
        let response = self.credentials.attach(builder).await.send().await?;
        handle_response(response).await
    }

    pub async fn update_note(&self, id: i64, content: &str) -> ApiResult<WeatherNote> {
        let builder = self
            .http_client
            .get_client()
            .put(self.url(&format!("api/notes/{}", id))?)
            .json(&NoteUpdate {
                content: content.to_string(),
            });
        let response = self.credentials.attach(builder).await.send().await?;
        handle_response(response).await
    }

    pub async fn delete_note(&self, id: i64) -> ApiResult<()> {
        let builder = self
            .http_client
            .get_client()
            .delete(self.url(&format!("api/notes/{}", id))?);
        let response = self.credentials.attach(builder).await.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from(response).await)
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    if response.status().is_success() {
        return Ok(response.json().await?);
    }
    Err(error_from(response).await)
}

/// Prefer the server's own message over a bare status line.
async fn error_from(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    if status == StatusCode::GATEWAY_TIMEOUT {
        return ApiError::Timeout(message);
    }
    ApiError::from_status(status, &message)
}

#[async_trait]
impl MeasurementStore for StationClient {
    async fn latest(&self) -> ApiResult<Option<Measurement>> {
        self.get_optional("api/weather/latest").await
    }

    async fn recent(&self, limit: u32) -> ApiResult<Vec<Measurement>> {
        self.get_json("api/weather/recent", &[("count", limit.to_string())])
            .await
    }

    async fn hourly(&self, since: Option<NaiveDate>) -> ApiResult<Vec<HourlyMeasurement>> {
        let query: Vec<(&str, String)> = since.map(|d| ("startDate", d.to_string())).into_iter().collect();
        self.get_json("api/weather/hourly", &query).await
    }

    async fn daily(&self, since: Option<NaiveDate>) -> ApiResult<Vec<DailyMeasurement>> {
        let query: Vec<(&str, String)> = since.map(|d| ("startDate", d.to_string())).into_iter().collect();
        self.get_json("api/weather/daily", &query).await
    }

    async fn by_date(&self, date: NaiveDate) -> ApiResult<Option<Measurement>> {
        self.get_optional(&format!("api/weather/date/{}", date)).await
    }

    async fn latest_prediction(&self) -> ApiResult<Option<WeatherPrediction>> {
        self.get_optional("api/weather/prediction/latest").await
    }

    async fn recent_predictions(&self, count: u32) -> ApiResult<Vec<WeatherPrediction>> {
        self.get_json("api/weather/prediction/recent", &[("count", count.to_string())])
            .await
    }
}
