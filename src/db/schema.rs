//! Store schema
//!
//! Both credential tables share one shape: a value column plus the `source`
//! label, unique on the pair. The `LOWER(value)` index serves case-folded
//! exact matches.

use crate::core::error::Result;
use crate::core::query::CredentialTable;
use rusqlite::Connection;
use tracing::info;

/// DDL for one credential table
pub fn table_ddl(table: CredentialTable) -> String {
    let name = table.table_name();
    let column = table.column();
    format!(
        "CREATE TABLE IF NOT EXISTS {name} (
            {column} TEXT NOT NULL,
            source TEXT NOT NULL,
            UNIQUE({column}, source)
        );
        CREATE INDEX IF NOT EXISTS idx_{name}_lower ON {name}(LOWER({column}));
        CREATE INDEX IF NOT EXISTS idx_{name}_source ON {name}(source);"
    )
}

/// Create both credential tables if they are missing
pub fn create_tables(conn: &Connection) -> Result<()> {
    for table in CredentialTable::all() {
        conn.execute_batch(&table_ddl(table))?;
    }
    Ok(())
}

/// Drop and recreate both tables, discarding any previous import
pub fn recreate_tables(conn: &Connection) -> Result<()> {
    for table in CredentialTable::all() {
        info!(table = %table, "Recreating credential table");
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", table.table_name()))?;
    }
    create_tables(conn)
}
