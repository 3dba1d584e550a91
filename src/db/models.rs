//! Database models

use serde::{Deserialize, Serialize};

/// One matched row: the stored value (with its stored casing) and its source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialMatch {
    pub matched_string: String,
    pub source: String,
}

/// Row count contributed by one source dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub name: String,
    pub count: i64,
}

/// Aggregate view of the password table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStats {
    pub total_passwords: i64,
    pub sources: Vec<SourceCount>,
}
