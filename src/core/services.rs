//! Business logic services
//!
//! This module implements the application layer between the REST API and the
//! credential store: it turns validated search parameters into a bounded match
//! query and hands it to whatever [`CredentialStore`] it was built with.

use crate::core::error::Result;
use crate::core::query::{CredentialTable, MatchMode, MatchQuery};
use crate::db::models::{CredentialMatch, PasswordStats};
use crate::db::repository::CredentialStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Validated search parameters for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query_string: String,
    pub mode: MatchMode,
}

/// Credential lookup service
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    max_results: u32,
}

impl CredentialService {
    /// Create a new CredentialService capping every lookup at `max_results` rows
    pub fn new(store: Arc<dyn CredentialStore>, max_results: u32) -> Self {
        Self { store, max_results }
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    /// Search one credential table
    pub async fn search(&self, table: CredentialTable, params: &SearchParams) -> Result<Vec<CredentialMatch>> {
        let query = MatchQuery::build(table, &params.query_string, params.mode)
            .with_limit(self.max_results);

        // The query string itself is sensitive and never logged
        debug!(
            table = %table,
            query_len = params.query_string.chars().count(),
            ignore_case = params.mode.ignore_case,
            substring = params.mode.include_substring_matches,
            "Running credential lookup"
        );

        let started = Instant::now();
        let matches = self.store.lookup(&query).await?;

        info!(
            table = %table,
            matches = matches.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Credential lookup finished"
        );
        Ok(matches)
    }

    /// Password table statistics
    pub async fn stats(&self) -> Result<PasswordStats> {
        self.store.password_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CheckerError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store that records the queries it receives
    #[derive(Default)]
    struct RecordingStore {
        seen: Mutex<Vec<MatchQuery>>,
    }

    #[async_trait]
    impl CredentialStore for RecordingStore {
        async fn lookup(&self, query: &MatchQuery) -> Result<Vec<CredentialMatch>> {
            self.seen.lock().unwrap().push(query.clone());
            Ok(vec![CredentialMatch {
                matched_string: "hunter2".into(),
                source: "leakA".into(),
            }])
        }

        async fn password_stats(&self) -> Result<PasswordStats> {
            Ok(PasswordStats {
                total_passwords: 1,
                sources: vec![],
            })
        }
    }

    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn lookup(&self, _query: &MatchQuery) -> Result<Vec<CredentialMatch>> {
            Err(CheckerError::StoreUnavailable("pool exhausted".into()))
        }

        async fn password_stats(&self) -> Result<PasswordStats> {
            Err(CheckerError::Timeout("stats".into()))
        }
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query_string: query.to_string(),
            mode: MatchMode {
                ignore_case: true,
                include_substring_matches: false,
            },
        }
    }

    #[tokio::test]
    async fn test_search_applies_result_cap() {
        let store = Arc::new(RecordingStore::default());
        let service = CredentialService::new(store.clone(), 25);

        let matches = service.search(CredentialTable::Usernames, &params("aaron")).await.unwrap();
        assert_eq!(matches.len(), 1);

        let seen = store.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].table(), CredentialTable::Usernames);
        assert_eq!(seen[0].limit(), Some(25));
        assert_eq!(seen[0].param(), "aaron");
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let service = CredentialService::new(Arc::new(FailingStore), 10);

        let err = service.search(CredentialTable::Passwords, &params("x")).await.unwrap_err();
        assert!(matches!(err, CheckerError::StoreUnavailable(_)));

        let err = service.stats().await.unwrap_err();
        assert!(matches!(err, CheckerError::Timeout(_)));
    }
}
