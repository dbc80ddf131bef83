/// Application configuration module
use anyhow::Context;
use std::env;
use std::time::Duration;

/// Which note repository backs the notes API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteStoreKind {
    Memory,
    Postgres,
}

impl NoteStoreKind {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "pg" => Ok(Self::Postgres),
            other => anyhow::bail!("unknown NOTE_STORE '{}', expected memory or postgres", other),
        }
    }
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub auth: AuthConfig,
    pub fetch_timeout: Duration,
    pub note_store: NoteStoreKind,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// bcrypt work factor for stored passwords
    pub password_cost: u32,
    pub admin_username: String,
    pub admin_password: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required")?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using the development signing key");
            "defaultDevelopmentKey12345678901234567890".to_string()
        });

        let auth = AuthConfig {
            jwt_secret,
            token_ttl_days: env_u64("JWT_TTL_DAYS", 7) as i64,
            password_cost: env_u64("BCRYPT_COST", bcrypt::DEFAULT_COST as u64) as u32,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "Admin123!".to_string()),
        };

        let note_store = match env::var("NOTE_STORE") {
            Ok(raw) => NoteStoreKind::parse(&raw)?,
            Err(_) => NoteStoreKind::Memory,
        };

        Ok(Self {
            database_url,
            bind_addr,
            max_connections: env_u64("DB_MAX_CONNECTIONS", 5) as u32,
            auth,
            fetch_timeout: Duration::from_secs(env_u64("FETCH_TIMEOUT_SECONDS", 30)),
            note_store,
        })
    }
}

/// Configuration for the `station_report` client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub cache_dir: String,
    pub fetch_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut api_url =
            env::var("STATION_API_URL").unwrap_or_else(|_| "http://localhost:3000/".to_string());
        // Relative endpoint paths are joined onto the base, which needs the slash.
        if !api_url.ends_with('/') {
            api_url.push('/');
        }

        Self {
            api_url,
            cache_dir: env::var("STATION_CACHE_DIR").unwrap_or_else(|_| ".station-cache".to_string()),
            fetch_timeout: Duration::from_secs(env_u64("FETCH_TIMEOUT_SECONDS", 30)),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_store_kind_parse() {
        assert_eq!(NoteStoreKind::parse("memory").unwrap(), NoteStoreKind::Memory);
        assert_eq!(NoteStoreKind::parse(" Postgres ").unwrap(), NoteStoreKind::Postgres);
        assert!(NoteStoreKind::parse("redis").is_err());
    }

    #[test]
    fn test_env_u64_falls_back_on_garbage() {
        env::set_var("WEATHER_STATION_TEST_U64", "not-a-number");
        assert_eq!(env_u64("WEATHER_STATION_TEST_U64", 42), 42);
        env::set_var("WEATHER_STATION_TEST_U64", "17");
        assert_eq!(env_u64("WEATHER_STATION_TEST_U64", 42), 17);
    }
}
