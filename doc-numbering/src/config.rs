//! Numbering engine configuration

use crate::numbering::retry::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES, RetryPolicy,
};

/// Engine configuration, read from the environment (`.env` supported)
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    pub db_max_connections: u32,
    /// How long a writer waits for the SQLite write lock
    pub db_busy_timeout_ms: u64,
    /// Conflict retry budget
    pub retry: RetryPolicy,
    /// Environment: development | staging | production
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "data/numbering.db".into(),
            db_max_connections: 8,
            db_busy_timeout_ms: 5000,
            retry: RetryPolicy::default(),
            environment: "development".into(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.db_max_connections),
            db_busy_timeout_ms: env_parse("DB_BUSY_TIMEOUT_MS")
                .unwrap_or(defaults.db_busy_timeout_ms),
            retry: RetryPolicy::new(
                env_parse("NUMBERING_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES),
                env_parse("NUMBERING_RETRY_BASE_MS").unwrap_or(DEFAULT_BASE_DELAY_MS),
                env_parse("NUMBERING_RETRY_MAX_MS").unwrap_or(DEFAULT_MAX_DELAY_MS),
            ),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
