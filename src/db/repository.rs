//! Repository pattern implementation for data access layer
//!
//! The lookup executor sits behind [`CredentialStore`] so the service layer can
//! be exercised against any store, including one that is failing.

use crate::core::error::{CheckerError, Result};
use crate::core::query::{CredentialTable, MatchQuery};
use crate::db::manager::DatabaseManager;
use crate::db::models::{CredentialMatch, PasswordStats, SourceCount};
use async_trait::async_trait;
use rusqlite::params;
use std::sync::Arc;

/// Read-only access to the credential corpus
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Run a built match query; rows come back in store order
    async fn lookup(&self, query: &MatchQuery) -> Result<Vec<CredentialMatch>>;

    /// Total password rows and per-source counts, largest source first
    async fn password_stats(&self) -> Result<PasswordStats>;
}

/// Repository over the pooled SQLite store
pub struct CredentialRepository {
    db: Arc<DatabaseManager>,
}

impl CredentialRepository {
    /// Create a new CredentialRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Number of rows in one table
    pub async fn count(&self, table: CredentialTable) -> Result<i64> {
        self.db.execute(move |conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
            Ok(conn.query_row(&sql, [], |row| row.get(0))?)
        }).await
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn lookup(&self, query: &MatchQuery) -> Result<Vec<CredentialMatch>> {
        let query = query.clone();
        self.db.execute(move |conn| {
            let mut stmt = conn.prepare(&query.sql())?;

            let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<CredentialMatch> {
                Ok(CredentialMatch {
                    matched_string: row.get(0)?,
                    source: row.get(1)?,
                })
            };

            let rows = match query.limit() {
                Some(limit) => stmt.query_map(params![query.param(), limit], map_row)?,
                None => stmt.query_map(params![query.param()], map_row)?,
            };

            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        }).await
    }

    async fn password_stats(&self) -> Result<PasswordStats> {
        self.db.execute(|conn| {
            // One read transaction so the total and the breakdown agree
            let tx = conn.unchecked_transaction()?;

            let total_passwords: i64 =
                tx.query_row("SELECT COUNT(*) FROM passwords", [], |row| row.get(0))?;

            let mut stmt = tx.prepare(
                "SELECT source, COUNT(*) AS count FROM passwords \
                 GROUP BY source ORDER BY count DESC, source ASC"
            )?;
            let sources = stmt
                .query_map([], |row| {
                    Ok(SourceCount {
                        name: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(PasswordStats {
                total_passwords,
                sources,
            })
        }).await
    }
}

/// Stand-in used when the store could not be opened at startup.
/// Every call fails with `StoreUnavailable`, so health keeps answering while
/// lookups report 503.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl CredentialStore for UnavailableStore {
    async fn lookup(&self, _query: &MatchQuery) -> Result<Vec<CredentialMatch>> {
        Err(CheckerError::StoreUnavailable(self.reason.clone()))
    }

    async fn password_stats(&self) -> Result<PasswordStats> {
        Err(CheckerError::StoreUnavailable(self.reason.clone()))
    }
}
