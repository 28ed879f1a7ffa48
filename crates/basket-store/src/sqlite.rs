//! # SQLite Blob Store
//!
//! Connection pool creation and the `blobs` table backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Blob Store                                  │
//! │                                                                         │
//! │  Hub startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteConfig::new(path) ← Configure pool settings                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteStore::new(config).await ← Create pool + run migrations         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  blobs                                   │                           │
//! │  │  key (PK) │ version │ data │ updated_at │                           │
//! │  │  ─────────┼─────────┼──────┼────────────│                           │
//! │  │  sh…products      2   {…}   2026-…      │                           │
//! │  │  sh…active_list   2   {…}   2026-…      │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  save = INSERT … ON CONFLICT(key) DO UPDATE (one statement, atomic)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases run in WAL mode so reads from one list don't wait on a
//! write to another.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

use crate::backend::{BlobStore, STORAGE_VERSION};
use crate::error::{StoreError, StoreResult};
use crate::migrations;

// =============================================================================
// Configuration
// =============================================================================

/// SQLite store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = SqliteConfig::new("/var/lib/basket/basket.db")
///     .max_connections(5);
/// ```
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file. `None` means in-memory.
    pub database_path: Option<PathBuf>,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl SqliteConfig {
    /// Creates a configuration for a database file (created if missing).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteConfig {
            database_path: Some(path.into()),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory configuration (for testing).
    ///
    /// The database lives as long as its single connection, so the pool
    /// never lets that connection idle out.
    pub fn in_memory() -> Self {
        SqliteConfig {
            database_path: None,
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Blob store over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates the pool and (by default) applies migrations.
    pub async fn new(config: SqliteConfig) -> StoreResult<Self> {
        let (connect_options, pool_options) = match &config.database_path {
            Some(path) => {
                info!(path = %path.display(), "Opening SQLite blob store");

                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.connect_timeout);

                (options, pool)
            }
            None => {
                info!("Opening in-memory SQLite blob store");

                let options = SqliteConnectOptions::from_str("sqlite::memory:")
                    .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .acquire_timeout(config.connect_timeout);

                (options, pool)
            }
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "SQLite pool created");

        let store = SqliteStore { pool };

        if config.run_migrations {
            migrations::run_migrations(&store.pool).await?;
        }

        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool. Later operations fail with `Unavailable`.
    pub async fn close(&self) {
        info!("Closing SQLite blob store");
        self.pool.close().await;
    }

    /// Checks if the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let row: Option<String> = sqlx::query_scalar("SELECT data FROM blobs WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(data) => serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| StoreError::corrupt(key, e)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, data: Value) -> StoreResult<()> {
        let encoded = serde_json::to_string(&data)?;

        sqlx::query(
            r#"
            INSERT INTO blobs (key, version, data, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                version = excluded.version,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(STORAGE_VERSION as i64)
        .bind(encoded)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(key = %key, "Blob saved");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SqliteStore::new(SqliteConfig::in_memory()).await.unwrap();
        assert!(store.health_check().await);
        assert_eq!(store.load("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = SqliteStore::new(SqliteConfig::in_memory()).await.unwrap();

        store.save("k", json!({"milk": {"qty": 1}})).await.unwrap();
        store.save("k", json!({"milk": {"qty": 4}})).await.unwrap();

        assert_eq!(store.load("k").await.unwrap(), Some(json!({"milk": {"qty": 4}})));
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basket.db");

        let store = SqliteStore::new(SqliteConfig::new(&path)).await.unwrap();
        store.save("k", json!([1, 2, 3])).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::new(SqliteConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.load("k").await.unwrap(), Some(json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_closed_pool_fails() {
        let store = SqliteStore::new(SqliteConfig::in_memory()).await.unwrap();
        store.close().await;

        assert!(store.save("k", json!({})).await.is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = SqliteConfig::new("/tmp/basket.db")
            .max_connections(10)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert!(!config.run_migrations);
    }
}
