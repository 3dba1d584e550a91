//! Match query construction
//!
//! Translates a search request into a parameterized SQL lookup. The statement
//! shape (table, column, operator) comes only from [`CredentialTable`]; the user's
//! input is always carried as a bound parameter, never spliced into SQL text.

use serde::Serialize;
use std::fmt;

/// Escape character used in every `LIKE ... ESCAPE` clause
pub const LIKE_ESCAPE: char = '\\';

/// The credential relations that can be searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialTable {
    Passwords,
    Usernames,
}

impl CredentialTable {
    /// Table name in the store
    pub fn table_name(self) -> &'static str {
        match self {
            CredentialTable::Passwords => "passwords",
            CredentialTable::Usernames => "usernames",
        }
    }

    /// Value column of the table
    pub fn column(self) -> &'static str {
        match self {
            CredentialTable::Passwords => "password",
            CredentialTable::Usernames => "username",
        }
    }

    pub fn all() -> [CredentialTable; 2] {
        [CredentialTable::Passwords, CredentialTable::Usernames]
    }
}

impl fmt::Display for CredentialTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// How the stored value is compared against the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchMode {
    pub ignore_case: bool,
    pub include_substring_matches: bool,
}

/// A ready-to-run lookup: SQL text plus its bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    table: CredentialTable,
    sql: String,
    param: String,
    limit: Option<u32>,
}

impl MatchQuery {
    /// Build the lookup for `input` against `table`.
    ///
    /// `input` is bound as `?1`. For substring matching it is first escaped with
    /// [`escape_like`] so `%`, `_` and `\` in the input only ever match themselves.
    pub fn build(table: CredentialTable, input: &str, mode: MatchMode) -> Self {
        let column = table.column();

        let (column_expr, input_expr) = if mode.ignore_case {
            (format!("LOWER({})", column), "LOWER(?1)")
        } else {
            (column.to_string(), "?1")
        };

        let (where_clause, param) = if mode.include_substring_matches {
            (
                format!(
                    "{} LIKE '%' || {} || '%' ESCAPE '{}'",
                    column_expr, input_expr, LIKE_ESCAPE
                ),
                escape_like(input),
            )
        } else {
            (format!("{} = {}", column_expr, input_expr), input.to_string())
        };

        let sql = format!(
            "SELECT {}, source FROM {} WHERE {}",
            column,
            table.table_name(),
            where_clause
        );

        Self {
            table,
            sql,
            param,
            limit: None,
        }
    }

    /// Cap the number of returned rows; the cap is bound as `?2`
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> CredentialTable {
        self.table
    }

    /// Full SQL text, including the `LIMIT` placeholder when a cap is set
    pub fn sql(&self) -> String {
        match self.limit {
            Some(_) => format!("{} LIMIT ?2", self.sql),
            None => self.sql.clone(),
        }
    }

    /// Value bound to `?1`
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Value bound to `?2`, if any
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }
}

/// Escape `LIKE` metacharacters so the result matches `input` literally
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
