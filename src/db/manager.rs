//! Database manager implementation
//!
//! This module provides store connection management with:
//! - SQLite connection pool using r2d2, opened read-only for serving
//! - Async wrapper running each operation on the blocking pool
//! - Bounded connection acquisition and per-call timeouts
//! - Transaction support for the one-time setup path

use crate::core::error::{CheckerError, ErrorContext, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

/// Per-connection settings applied by the pool
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub pool_size: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
        }
    }
}

/// Database manager with connection pool
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<SqliteConnectionManager>,
    db_path: PathBuf,
    query_timeout: Duration,
}

/// Pragmas every connection runs with. `LIKE` must honor case so the
/// case-sensitive substring match is really case-sensitive.
fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;
    Ok(())
}

impl DatabaseManager {
    /// Open an existing store read-only for serving
    pub fn open_read_only(db_path: &Path, settings: PoolSettings) -> Result<Self> {
        if !db_path.exists() {
            return Err(CheckerError::StoreUnavailable(format!(
                "database file {} does not exist",
                db_path.display()
            )));
        }

        let busy_timeout = settings.busy_timeout;
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(move |conn| {
                configure_connection(conn, busy_timeout)?;
                conn.execute_batch("PRAGMA query_only = ON;")
            });

        let pool = Pool::builder()
            .max_size(settings.pool_size)
            .connection_timeout(settings.acquire_timeout)
            .build(manager)
            .with_context(|| format!("Failed to open credential store {}", db_path.display()))?;

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
            query_timeout: settings.query_timeout,
        })
    }

    /// Create a new DatabaseManager with an in-memory database for testing
    pub fn new_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| configure_connection(conn, Duration::from_secs(5)));

        let pool = Pool::builder()
            .max_size(1) // In-memory databases should use a single connection
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .with_context(|| "Failed to open in-memory store".to_string())?;

        Ok(Self {
            pool,
            db_path: PathBuf::from(":memory:"),
            query_timeout: PoolSettings::default().query_timeout,
        })
    }

    /// Get a connection from the pool, waiting at most the acquire timeout
    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| CheckerError::StoreUnavailable(format!("connection unavailable: {}", e)))
    }

    /// Execute a database operation asynchronously
    ///
    /// The closure runs on the blocking pool with a pooled connection that is
    /// returned to the pool when the closure finishes, whatever the outcome.
    /// The whole call is bounded by the query timeout.
    pub async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        let handle = task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| {
                CheckerError::StoreUnavailable(format!("connection unavailable: {}", e))
            })?;
            f(&conn)
        });

        match tokio::time::timeout(self.query_timeout, handle).await {
            Ok(joined) => joined
                .map_err(|e| CheckerError::StoreUnavailable(format!("store task failed: {}", e)))?,
            Err(_) => Err(CheckerError::Timeout(format!(
                "store call exceeded {} ms",
                self.query_timeout.as_millis()
            ))),
        }
    }

    /// Execute a database operation within a transaction
    ///
    /// The transaction is committed if the closure returns Ok and rolled back
    /// otherwise. Only usable on writable stores.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                CheckerError::StoreUnavailable(format!("connection unavailable: {}", e))
            })?;

            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;

            Ok(result)
        })
        .await
        .map_err(|e| CheckerError::StoreUnavailable(format!("transaction task failed: {}", e)))?
    }

    /// Get the database file path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the current pool size
    pub fn pool_size(&self) -> u32 {
        self.pool.max_size()
    }
}
