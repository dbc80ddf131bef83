/// Weather station REST service entry point
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use weather_station::auth::{AuthService, PasswordHasher, TokenIssuer};
use weather_station::cache::ResultCache;
use weather_station::config::{AppConfig, NoteStoreKind};
use weather_station::handlers::AppState;
use weather_station::repo::{
    init_db, CacheRepo, InMemoryNoteRepo, InMemoryUserRepo, MeasurementRepo, NoteRepository,
    PgNoteRepo,
};
use weather_station::routes::build_router;
use weather_station::services::{NoteService, TemperatureService, WeatherService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Database connection pool established");

    init_db(&pool).await?;
    info!("Database schema initialized");

    // Repositories
    let measurements = Arc::new(MeasurementRepo::new(pool.clone()));
    let notes: Arc<dyn NoteRepository> = match config.note_store {
        NoteStoreKind::Memory => Arc::new(InMemoryNoteRepo::new()),
        NoteStoreKind::Postgres => Arc::new(PgNoteRepo::new(pool.clone())),
    };
    info!("Note store: {:?}", config.note_store);

    // Hasher, then the seeded user table, then the auth service on top of both
    let hasher = PasswordHasher::new(config.auth.password_cost);
    let admin_hash = hasher.hash(&config.auth.admin_password)?;
    let users = Arc::new(InMemoryUserRepo::with_user(&config.auth.admin_username, admin_hash));
    let tokens = TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_ttl_days);
    let auth = AuthService::new(users, hasher, tokens);

    let cache = ResultCache::new(Arc::new(CacheRepo::new(pool.clone())), config.fetch_timeout);

    let state = AppState {
        weather: Arc::new(WeatherService::new(measurements.clone())),
        temperature: Arc::new(TemperatureService::new(measurements, cache)),
        notes: Arc::new(NoteService::new(notes)),
        auth: Arc::new(auth),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("weather_station listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
