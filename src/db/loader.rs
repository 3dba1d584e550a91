//! Wordlist import
//!
//! Builds the store from plain-text wordlists: one value per line, one file per
//! source dataset, file stem used as the `source` label. Inserts ignore rows
//! that already exist, so repeated lines and repeated imports never produce
//! duplicate `(value, source)` pairs.

use crate::core::error::{CheckerError, Result};
use crate::core::query::CredentialTable;
use crate::db::schema;
use rusqlite::{params, Connection, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extension of importable wordlist files
pub const WORDLIST_EXTENSION: &str = "txt";

/// Outcome of importing one wordlist file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub table: CredentialTable,
    pub source: String,
    pub lines: usize,
    pub inserted: usize,
    /// Lines that held invalid UTF-8, stored with U+FFFD in place of the bad bytes
    pub lossy_lines: usize,
}

/// Decoded contents of one wordlist file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wordlist {
    pub values: Vec<String>,
    pub lossy_lines: usize,
}

/// Outcome of a full setup run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub files: Vec<ImportedFile>,
    pub total_passwords: i64,
    pub total_usernames: i64,
}

/// Insert values for one source, skipping pairs already present.
/// Returns the number of rows actually inserted.
pub fn insert_values<I, S>(tx: &Transaction<'_>, table: CredentialTable, source: &str, values: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}, source) VALUES (?1, ?2)",
        table.table_name(),
        table.column()
    );
    let mut stmt = tx.prepare_cached(&sql)?;

    let mut inserted = 0;
    for value in values {
        inserted += stmt.execute(params![value.as_ref(), source])?;
    }
    Ok(inserted)
}

/// Wordlist files directly inside `dir`, sorted by name
pub fn wordlist_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CheckerError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(WORDLIST_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Values of a wordlist: trimmed, blank lines skipped.
///
/// Invalid UTF-8 is replaced rather than rejected; the affected lines are
/// counted and reported with a warning.
pub fn read_wordlist(path: &Path) -> Result<Wordlist> {
    let bytes = fs::read(path)?;
    let (text, lossy) = match String::from_utf8(bytes) {
        Ok(text) => (text, false),
        Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), true),
    };

    let values: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let lossy_lines = if lossy {
        values.iter().filter(|v| v.contains(char::REPLACEMENT_CHARACTER)).count()
    } else {
        0
    };
    if lossy_lines > 0 {
        warn!(
            path = %path.display(),
            lossy_lines,
            "Wordlist is not valid UTF-8, invalid bytes replaced"
        );
    }

    Ok(Wordlist { values, lossy_lines })
}

/// Import every wordlist in `dir` into `table`
pub fn import_directory(tx: &Transaction<'_>, table: CredentialTable, dir: &Path) -> Result<Vec<ImportedFile>> {
    if !dir.is_dir() {
        warn!(table = %table, dir = %dir.display(), "Wordlist directory missing, skipping");
        return Ok(Vec::new());
    }

    let mut imported = Vec::new();
    for path in wordlist_files(dir)? {
        let Some(source) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            warn!(path = %path.display(), "Skipping wordlist with non UTF-8 name");
            continue;
        };

        let wordlist = read_wordlist(&path)?;
        let inserted = insert_values(tx, table, &source, &wordlist.values)?;

        info!(
            table = %table,
            source = %source,
            lines = wordlist.values.len(),
            inserted,
            "Imported wordlist"
        );
        imported.push(ImportedFile {
            table,
            source,
            lines: wordlist.values.len(),
            inserted,
            lossy_lines: wordlist.lossy_lines,
        });
    }
    Ok(imported)
}

/// Rebuild the store at `db_path` from `passwords_dir` and `usernames_dir`.
///
/// Existing tables are dropped first; the whole import runs in one transaction.
pub fn setup_database(db_path: &Path, passwords_dir: &Path, usernames_dir: &Path) -> Result<SetupReport> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(db_path)?;
    let tx = conn.transaction()?;
    schema::recreate_tables(&tx)?;

    let mut files = import_directory(&tx, CredentialTable::Passwords, passwords_dir)?;
    files.extend(import_directory(&tx, CredentialTable::Usernames, usernames_dir)?);

    let total_passwords = count_rows(&tx, CredentialTable::Passwords)?;
    let total_usernames = count_rows(&tx, CredentialTable::Usernames)?;
    tx.commit()?;

    info!(total_passwords, total_usernames, "Credential store ready");

    Ok(SetupReport {
        files,
        total_passwords,
        total_usernames,
    })
}

fn count_rows(conn: &Connection, table: CredentialTable) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
