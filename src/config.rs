//! Application configuration loaded from environment variables.

use std::env;

/// Default lifetime of a cached stats row before a ranking read refreshes it.
pub const DEFAULT_STATS_TTL_MINUTES: i64 = 60;

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Persistence backend
    pub storage_backend: StorageBackend,
    /// JWT verification key for session tokens issued by the auth service (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Stats cache lifetime
    pub stats_ttl_minutes: i64,
    /// Ranking page size when the client doesn't ask for one
    pub default_page_size: u32,
    /// Upper bound on a requested ranking page size
    pub max_page_size: u32,
}

impl Config {
    /// Config for tests: in-memory storage and a fixed signing key.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            stats_ttl_minutes: DEFAULT_STATS_TTL_MINUTES,
            default_page_size: 10,
            max_page_size: 100,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        let stats_ttl_minutes = parse_or("STATS_TTL_MINUTES", DEFAULT_STATS_TTL_MINUTES)?;
        if stats_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "STATS_TTL_MINUTES",
                stats_ttl_minutes.to_string(),
            ));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            storage_backend,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            stats_ttl_minutes,
            default_page_size: parse_or("DEFAULT_PAGE_SIZE", 10)?,
            max_page_size: parse_or("MAX_PAGE_SIZE", 100)?,
        })
    }

    /// Stats cache lifetime as a chrono duration.
    pub fn stats_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stats_ttl_minutes)
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
