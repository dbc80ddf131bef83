/// Business logic services layer
use crate::analysis::{recent_sample_count, summarize_recent, summarize_window};
use crate::cache::{keys, ttl, ResultCache};
use crate::domain::{
    AnalysisResult, DailyMeasurement, HourlyMeasurement, Measurement, NoteRequest, NoteUpdate,
    WeatherNote, WeatherPrediction,
};
use crate::errors::{ApiError, ApiResult};
use crate::repo::{MeasurementStore, NoteRepository};
use crate::utils::{month_bounds, window_start};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// Longest span the notes listing accepts.
pub const MAX_NOTE_RANGE_DAYS: i64 = 366;

/// Uncached reads backing the REST surface
pub struct WeatherService {
    store: Arc<dyn MeasurementStore>,
}

impl WeatherService {
    pub fn new(store: Arc<dyn MeasurementStore>) -> Self {
        Self { store }
    }

    pub async fn latest(&self) -> ApiResult<Measurement> {
        self.store
            .latest()
            .await?
            .ok_or_else(|| ApiError::not_found("No measurements found"))
    }

    pub async fn recent(&self, count: u32) -> ApiResult<Vec<Measurement>> {
        if count == 0 {
            return Err(ApiError::invalid("count must be greater than 0"));
        }
        self.store.recent(count).await
    }

    pub async fn hourly(&self, since: Option<NaiveDate>) -> ApiResult<Vec<HourlyMeasurement>> {
        self.store.hourly(since).await
    }

    pub async fn daily(&self, since: Option<NaiveDate>) -> ApiResult<Vec<DailyMeasurement>> {
        self.store.daily(since).await
    }

    pub async fn by_date(&self, date: NaiveDate) -> ApiResult<Measurement> {
        self.store
            .by_date(date)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No measurements found for date {}", date)))
    }

    pub async fn latest_prediction(&self) -> ApiResult<WeatherPrediction> {
        self.store
            .latest_prediction()
            .await?
            .ok_or_else(|| ApiError::not_found("No predictions found"))
    }

    pub async fn recent_predictions(&self, count: u32) -> ApiResult<Vec<WeatherPrediction>> {
        if count == 0 {
            return Err(ApiError::invalid("count must be greater than 0"));
        }
        self.store.recent_predictions(count).await
    }
}

/// Cached measurement reads and the two trend analyses.
///
/// Works over any [`MeasurementStore`]: the Postgres repository on the
/// server, the REST client in `station_report`.
pub struct TemperatureService {
    store: Arc<dyn MeasurementStore>,
    cache: ResultCache,
}

impl TemperatureService {
    pub fn new(store: Arc<dyn MeasurementStore>, cache: ResultCache) -> Self {
        Self { store, cache }
    }

    pub async fn latest(&self) -> ApiResult<Option<Measurement>> {
        self.cache
            .get_or_fetch(keys::LATEST_MEASUREMENT, ttl::LATEST, || self.store.latest())
            .await
    }

    /// Newest first.
    pub async fn recent(&self, count: u32) -> ApiResult<Vec<Measurement>> {
        self.cache
            .get_or_fetch(&keys::recent(count), ttl::RECENT, || self.store.recent(count))
            .await
    }

    /// Today's readings (UTC) among the last 100, oldest first.
    pub async fn todays_measurements(&self) -> ApiResult<Vec<Measurement>> {
        let today = Utc::now().date_naive();
        let mut today_only: Vec<Measurement> = self
            .recent(100)
            .await?
            .into_iter()
            .filter(|m| m.timestamp_ms.date_naive() == today)
            .collect();
        today_only.sort_by_key(|m| m.timestamp_ms);
        Ok(today_only)
    }

    pub async fn hourly(&self, days: u32) -> ApiResult<Vec<HourlyMeasurement>> {
        let since = window_start(Utc::now(), days);
        self.cache
            .get_or_fetch(&keys::hourly(days), ttl::HOURLY, || self.store.hourly(Some(since)))
            .await
    }

    pub async fn daily(&self, days: u32) -> ApiResult<Vec<DailyMeasurement>> {
        let since = window_start(Utc::now(), days);
        self.cache
            .get_or_fetch(&keys::daily(days), ttl::DAILY, || self.store.daily(Some(since)))
            .await
    }

    pub async fn latest_prediction(&self) -> ApiResult<Option<WeatherPrediction>> {
        self.cache
            .get_or_fetch(keys::LATEST_PREDICTION, ttl::PREDICTIONS, || {
                self.store.latest_prediction()
            })
            .await
    }

    pub async fn recent_predictions(&self, count: u32) -> ApiResult<Vec<WeatherPrediction>> {
        self.cache
            .get_or_fetch(&keys::predictions(count), ttl::PREDICTIONS, || {
                self.store.recent_predictions(count)
            })
            .await
    }

    /// Statistics over the trailing `days`. A failed fetch yields `success = false`.
    pub async fn analyze_window(&self, days: u32) -> AnalysisResult {
        let inputs = async {
            let daily = self.daily(days).await?;
            let hourly = self.hourly(days).await?;
            Ok::<_, ApiError>((daily, hourly))
        };

        match inputs.await {
            Ok((daily, hourly)) => {
                info!(days, daily = daily.len(), hourly = hourly.len(), "window analysis");
                summarize_window(&daily, &hourly)
            }
            Err(e) => {
                error!("window analysis over {} day(s) failed: {}", days, e);
                AnalysisResult::failed(format!("Error analyzing temperature data: {}", e))
            }
        }
    }

    /// Statistics over raw samples from the last `hours`.
    pub async fn analyze_recent(&self, hours: u32) -> AnalysisResult {
        match self.recent(recent_sample_count(hours)).await {
            Ok(samples) => summarize_recent(&samples, hours, Utc::now()),
            Err(e) => {
                error!("recent analysis over {} hour(s) failed: {}", hours, e);
                AnalysisResult::failed(format!("Error analyzing recent data: {}", e))
            }
        }
    }
}

/// Note rules on top of a [`NoteRepository`]
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    pub async fn by_date(&self, date: NaiveDate) -> ApiResult<WeatherNote> {
        self.repo
            .get_by_date(date)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No note found for date {}", date)))
    }

    /// Notes between `start` and `end` inclusive; defaults to the current month.
    pub async fn list(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ApiResult<Vec<WeatherNote>> {
        let (first, last) = month_bounds(Utc::now().date_naive());
        let start = start.unwrap_or(first);
        let end = end.unwrap_or(last);

        if end < start {
            return Ok(Vec::new());
        }
        if (end - start).num_days() > MAX_NOTE_RANGE_DAYS {
            return Err(ApiError::invalid(format!(
                "Date range cannot exceed {} days",
                MAX_NOTE_RANGE_DAYS
            )));
        }
        self.repo.list_range(start, end).await
    }

    pub async fn create(&self, request: &NoteRequest, user_id: &str) -> ApiResult<WeatherNote> {
        request.validate()?;
        let note = self.repo.create(request.date, &request.content, user_id).await?;
        info!(id = note.id, date = %note.date, "note created");
        Ok(note)
    }

    pub async fn update(&self, id: i64, update: &NoteUpdate) -> ApiResult<WeatherNote> {
        if update.content.trim().is_empty() {
            return Err(ApiError::invalid("note content is required"));
        }
        self.repo.update_content(id, &update.content).await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.repo.delete(id).await?;
        info!(id, "note deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyFields, TemperatureStats};
    use crate::repo::InMemoryNoteRepo;
    use crate::testing::{sample, FakeStore, MemoryDurable};
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    fn temperature_service(store: Arc<FakeStore>) -> TemperatureService {
        let cache = ResultCache::new(Arc::new(MemoryDurable::default()), std::time::Duration::from_secs(5));
        TemperatureService::new(store, cache)
    }

    fn daily(days_ago: i64, avg: f64) -> DailyMeasurement {
        DailyMeasurement {
            id: None,
            timestamp: None,
            timestamp_ms: Utc::now() - Duration::days(days_ago),
            day_timestamp: None,
            fields: DailyFields {
                temperature: TemperatureStats { avg, min: avg - 2.0, max: avg + 2.0 },
                ..Default::default()
            },
            tags: None,
        }
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_the_store_once() {
        let store = Arc::new(FakeStore {
            measurements: vec![sample(Utc::now(), 20.0, 1010.0)],
            ..Default::default()
        });
        let service = temperature_service(store.clone());

        service.recent(25).await.unwrap();
        service.recent(25).await.unwrap();
        assert_eq!(store.calls(), 1);

        service.recent(100).await.unwrap();
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_analyze_window_trend() {
        let store = Arc::new(FakeStore {
            // Deliberately out of order.
            daily: vec![daily(1, 12.0), daily(3, 10.0), daily(0, 9.0)],
            ..Default::default()
        });
        let service = temperature_service(store);

        let result = service.analyze_window(7).await;
        assert!(result.success);
        assert!((result.temperature_trend - -1.0).abs() < 1e-9);
        assert_eq!(result.highest_temperature, 14.0);
        assert_eq!(result.lowest_temperature, 7.0);
        assert!(result.hourly_temperatures.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_window_failure_is_reported_not_raised() {
        let store = Arc::new(FakeStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let service = temperature_service(store);

        let result = service.analyze_window(7).await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_next_time() {
        let store = Arc::new(FakeStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let service = temperature_service(store.clone());

        assert!(!service.analyze_recent(1).await.success);
        store.failing.store(false, Ordering::SeqCst);
        let result = service.analyze_recent(1).await;
        assert_eq!(store.calls(), 2);
        assert_eq!(
            result.error_message.as_deref(),
            Some("No recent measurements available")
        );
    }

    #[tokio::test]
    async fn test_analyze_recent_over_samples() {
        let now = Utc::now();
        let store = Arc::new(FakeStore {
            measurements: vec![
                sample(now - Duration::minutes(1), 22.0, 1012.0),
                sample(now - Duration::minutes(6), 21.0, 1011.0),
                sample(now - Duration::minutes(11), 20.0, 1010.0),
                sample(now - Duration::hours(3), 5.0, 990.0),
            ],
            ..Default::default()
        });
        let service = temperature_service(store);

        let result = service.analyze_recent(1).await;
        assert!(result.success);
        assert_eq!(result.measurement_count, Some(3));
        assert_eq!(result.sample_rate, Some(5.0));
        assert!((result.temperature_trend - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_todays_measurements_are_ascending() {
        let now = Utc::now();
        let yesterday = now - Duration::days(1);
        let store = Arc::new(FakeStore {
            measurements: vec![
                sample(now, 3.0, 0.0),
                sample(now - Duration::seconds(1), 2.0, 0.0),
                sample(yesterday, 1.0, 0.0),
            ],
            ..Default::default()
        });
        let service = temperature_service(store);

        let today = service.todays_measurements().await.unwrap();
        assert!(today.iter().all(|m| m.timestamp_ms.date_naive() == now.date_naive()));
        assert!(today.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    }

    #[tokio::test]
    async fn test_weather_service_not_found_and_validation() {
        let service = WeatherService::new(Arc::new(FakeStore::default()));
        assert!(matches!(service.latest().await, Err(ApiError::NotFound(_))));
        assert!(matches!(service.recent(0).await, Err(ApiError::InvalidInput(_))));
        assert!(matches!(
            service.latest_prediction().await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_note_range_rules() {
        let notes = NoteService::new(Arc::new(InMemoryNoteRepo::new()));
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();

        let too_long = notes.list(Some(d(2023, 1, 1)), Some(d(2024, 6, 1))).await;
        assert!(matches!(too_long, Err(ApiError::InvalidInput(_))));

        let leap_year = notes.list(Some(d(2024, 1, 1)), Some(d(2024, 12, 31))).await;
        assert!(leap_year.unwrap().is_empty());

        let reversed = notes.list(Some(d(2024, 6, 1)), Some(d(2024, 5, 1))).await;
        assert!(reversed.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_note_content_is_required() {
        let notes = NoteService::new(Arc::new(InMemoryNoteRepo::new()));
        let request = NoteRequest {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            content: "".into(),
        };
        assert!(matches!(
            notes.create(&request, "1").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            notes.update(1, &NoteUpdate { content: " ".into() }).await,
            Err(ApiError::InvalidInput(_))
        ));
    }
}
