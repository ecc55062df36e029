//! SQLite-backed key-value store.
//!
//! Values live in a single `kv_store` table. Every call runs on the blocking
//! pool with a connection checked out of an r2d2 pool.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::KeyValueStore;
use fieldsync_domain::{FieldSyncError, Result, StorageConfig};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use tracing::{debug, info};

use crate::errors::InfraError;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )";

const UPSERT_SQL: &str = "INSERT INTO kv_store (key, value, updated_at)
    VALUES (?1, ?2, CAST(strftime('%s','now') AS INTEGER))
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable store for queue and sync state.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
    location: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database described by `config`.
    ///
    /// An in-memory database is pinned to a single pooled connection that is
    /// never reaped, since every SQLite `:memory:` connection is a separate
    /// database and closing it drops the data.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let (manager, max_size) = if config.is_in_memory() {
            (SqliteConnectionManager::memory(), 1)
        } else {
            (SqliteConnectionManager::file(Path::new(&config.path)), config.pool_size.max(1))
        };
        let in_memory = config.is_in_memory();
        let manager = manager.with_init(move |conn| configure_connection(conn, in_memory));

        let mut builder = Pool::builder().max_size(max_size).connection_timeout(BUSY_TIMEOUT);
        if in_memory {
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        let pool = builder.build(manager).map_err(InfraError::from)?;
        let store = Self { pool: Arc::new(pool), location: config.path.clone() };
        store.create_schema()?;

        info!(db_path = %store.location, max_connections = max_size, "sqlite store opened");
        Ok(store)
    }

    /// Open a file-backed store at `path` with the default pool size.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = StorageConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        Self::open(&config)
    }

    /// Open a private in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::open(&StorageConfig { path: ":memory:".into(), pool_size: 1 })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Verify that a connection can be checked out and queried.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0)).map_err(InfraError::from)?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(InfraError::from)?;
        Ok(())
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        task::spawn_blocking(move || -> Result<T> {
            let mut conn = pool.get().map_err(InfraError::from)?;
            op(&mut *conn)
        })
        .await
        .map_err(InfraError::from)?
    }
}

fn configure_connection(conn: &mut Connection, in_memory: bool) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if !in_memory {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    }
    Ok(())
}

fn sql_error(err: rusqlite::Error) -> FieldSyncError {
    FieldSyncError::from(InfraError::from(err))
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(sql_error)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_connection(move |conn| {
            conn.execute(UPSERT_SQL, params![key, value]).map_err(sql_error)?;
            debug!(key = %key, bytes = value.len(), "kv value written");
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key]).map_err(sql_error)?;
            Ok(())
        })
        .await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_string()).collect();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(sql_error)?;
            {
                let mut stmt =
                    tx.prepare("DELETE FROM kv_store WHERE key = ?1").map_err(sql_error)?;
                for key in &keys {
                    stmt.execute(params![key]).map_err(sql_error)?;
                }
            }
            tx.commit().map_err(sql_error)
        })
        .await
    }
}
