use crate::db::models::{PasswordStats, SourceCount};
use serde::{Deserialize, Serialize};

/// Response for GET /health
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// One entry of the per-source breakdown
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCountResponse {
    pub name: String,
    pub count: i64,
}

/// Response for GET /stats
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub total_passwords: i64,
    pub sources: Vec<SourceCountResponse>,
}

impl From<SourceCount> for SourceCountResponse {
    fn from(source: SourceCount) -> Self {
        Self {
            name: source.name,
            count: source.count,
        }
    }
}

impl From<PasswordStats> for StatsResponse {
    fn from(stats: PasswordStats) -> Self {
        Self {
            total_passwords: stats.total_passwords,
            sources: stats.sources.into_iter().map(Into::into).collect(),
        }
    }
}
