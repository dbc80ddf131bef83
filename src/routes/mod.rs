/// Application routes configuration
use crate::handlers::{
    create_note, daily_measurements, delete_note, health, hourly_measurements, latest_measurement,
    latest_prediction, list_notes, login, measurement_by_date, note_by_date, recent_analysis,
    recent_measurements, recent_predictions, update_note, window_analysis, AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Measurements
        .route("/api/weather/latest", get(latest_measurement))
        .route("/api/weather/recent", get(recent_measurements))
        .route("/api/weather/hourly", get(hourly_measurements))
        .route("/api/weather/daily", get(daily_measurements))
        .route("/api/weather/date/:date", get(measurement_by_date))
        .route("/api/weather/prediction/latest", get(latest_prediction))
        .route("/api/weather/prediction/recent", get(recent_predictions))
        // Analyses
        .route("/api/weather/analysis", get(window_analysis))
        .route("/api/weather/analysis/recent", get(recent_analysis))
        // Notes: GET takes a date, PUT/DELETE an id
        .route("/api/notes", get(list_notes).post(create_note))
        .route(
            "/api/notes/:key",
            get(note_by_date).put(update_note).delete(delete_note),
        )
        // Auth
        .route("/api/auth/login", post(login))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
    use crate::cache::ResultCache;
    use crate::repo::{InMemoryNoteRepo, InMemoryUserRepo};
    use crate::services::{NoteService, TemperatureService, WeatherService};
    use crate::testing::{sample, FakeStore, MemoryDurable};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret-0123456789";

    fn app_with(store: FakeStore) -> Router {
        let store = Arc::new(store);
        let hasher = PasswordHasher::new(4);
        let users = InMemoryUserRepo::with_user("admin", hasher.hash("Admin123!").unwrap());
        let auth = AuthService::new(Arc::new(users), hasher, TokenIssuer::new(SECRET, 7));
        let cache = ResultCache::new(Arc::new(MemoryDurable::default()), Duration::from_secs(5));

        build_router(AppState {
            weather: Arc::new(WeatherService::new(store.clone())),
            temperature: Arc::new(TemperatureService::new(store, cache)),
            notes: Arc::new(NoteService::new(Arc::new(InMemoryNoteRepo::new()))),
            auth: Arc::new(auth),
        })
    }

    fn app() -> Router {
        app_with(FakeStore::default())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn token(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_req(
                "POST",
                "/api/auth/login",
                None,
                json!({ "username": "admin", "password": "Admin123!" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_latest_is_404_on_empty_store() {
        let response = app().oneshot(get_req("/api/weather/latest")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_recent_defaults_and_validation() {
        let now = Utc::now();
        let store = FakeStore {
            measurements: (0..30)
                .map(|i| sample(now - chrono::Duration::minutes(i * 2), 20.0, 1010.0))
                .collect(),
            ..Default::default()
        };
        let app = app_with(store);

        let response = app.clone().oneshot(get_req("/api/weather/recent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 25);

        let response = app.oneshot(get_req("/api/weather/recent?count=0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analysis_on_empty_store_succeeds() {
        let response = app().oneshot(get_req("/api/weather/analysis?days=3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["highestTemperature"], 0.0);
        assert!(body["hourlyTemperatures"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_analysis_reports_empty_window() {
        let store = FakeStore {
            measurements: vec![sample(Utc::now() - chrono::Duration::hours(5), 20.0, 1010.0)],
            ..Default::default()
        };
        let response = app_with(store)
            .oneshot(get_req("/api/weather/analysis/recent?hours=2"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errorMessage"], "No measurements found in the last 2 hour(s)");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let response = app()
            .oneshot(json_req(
                "POST",
                "/api/auth/login",
                None,
                json!({ "username": "admin", "password": "nope" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Invalid username or password"
        );
    }

    #[tokio::test]
    async fn test_note_writes_require_token() {
        let response = app()
            .oneshot(json_req(
                "POST",
                "/api/notes",
                None,
                json!({ "date": "2024-05-01", "content": "fog" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(json_req("DELETE", "/api/notes/1", Some("not-a-jwt"), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_note_lifecycle_over_http() {
        let app = app();
        let token = token(&app).await;

        let response = app
            .clone()
            .oneshot(json_req(
                "POST",
                "/api/notes",
                Some(&token),
                json!({ "date": "2024-05-01T08:30:00", "content": "fog" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/api/notes/2024-05-01");
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_req(
                "POST",
                "/api/notes",
                Some(&token),
                json!({ "date": "2024-05-01", "content": "again" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Note already exists for date 2024-05-01"
        );

        let response = app
            .clone()
            .oneshot(json_req(
                "PUT",
                &format!("/api/notes/{}", id),
                Some(&token),
                json!({ "content": "fog, then sun" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get_req("/api/notes/2024-05-01")).await.unwrap();
        assert_eq!(body_json(response).await["content"], "fog, then sun");

        let response = app
            .clone()
            .oneshot(get_req("/api/notes?startDate=2024-05-01&endDate=2024-05-31"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/notes/{}", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get_req("/api/notes/2024-05-01")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_numeric_note_id_gets_error_envelope() {
        let app = app();
        let token = token(&app).await;

        for method in ["PUT", "DELETE"] {
            let response = app
                .clone()
                .oneshot(json_req(method, "/api/notes/abc", Some(&token), json!({ "content": "x" })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["ok"], false);
            assert_eq!(body["error"]["code"], "INVALID_INPUT");
            assert_eq!(body["error"]["message"], "invalid note id 'abc'");
        }
    }

    #[tokio::test]
    async fn test_recent_analysis_with_huge_hours_answers() {
        let store = FakeStore {
            measurements: vec![sample(Utc::now() - chrono::Duration::hours(5), 20.0, 1010.0)],
            ..Default::default()
        };
        let response = app_with(store)
            .oneshot(get_req(&format!("/api/weather/analysis/recent?hours={}", u32::MAX)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["measurementCount"], 1);
    }

    #[tokio::test]
    async fn test_note_range_too_long_is_rejected() {
        let response = app()
            .oneshot(get_req("/api/notes?startDate=2022-01-01&endDate=2024-01-01"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
