//! Database Module
//!
//! Handles the SQLite connection pool and migrations

pub mod repository;

use crate::config::Config;
use crate::error::{NumberingError, NumberingResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

/// Database service, owns the SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open (or create) the database file in WAL mode and apply migrations
    pub async fn new(config: &Config) -> NumberingResult<Self> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                NumberingError::StorageUnavailable(format!(
                    "Failed to create database directory: {e}"
                ))
            })?;
        }

        // WAL, foreign keys, normal sync; writers wait for the lock instead of failing
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.database_path))
            .map_err(|e| NumberingError::Database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.db_busy_timeout_ms))
            .optimize_on_close(true, None);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                NumberingError::StorageUnavailable(format!("Failed to open database: {e}"))
            })?;

        tracing::info!(
            path = %config.database_path,
            max_connections = config.db_max_connections,
            busy_timeout_ms = config.db_busy_timeout_ms,
            "Database connection established (SQLite WAL)"
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database (single connection, tests and dry runs)
    pub async fn in_memory() -> NumberingResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| NumberingError::Database(format!("Invalid database path: {e}")))?
            .foreign_keys(true);

        // Every connection to :memory: is a separate database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> NumberingResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}
