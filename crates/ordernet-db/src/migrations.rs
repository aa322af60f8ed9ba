//! Schema migration.
//!
//! Forward-only and idempotent: the base schema uses `IF NOT EXISTS`
//! throughout, and each column addition is attempted on every open. A
//! failure caused by the column already existing is silently absorbed; any
//! other failure is fatal.

use rusqlite::Connection;

use crate::{schema, DbError, Result};

/// Bring the schema fully forward.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::SCHEMA).map_err(DbError::Sqlite)?;

    for ddl in schema::FORWARD_MIGRATIONS {
        match conn.execute_batch(ddl) {
            Ok(()) => {}
            Err(e) if is_duplicate_column(&e) => {
                tracing::trace!("column already present, skipping: {ddl}");
            }
            Err(e) => {
                return Err(DbError::Migration(format!("{ddl}: {e}")));
            }
        }
    }

    Ok(())
}

/// SQLite reports a pre-existing column as "duplicate column name".
fn is_duplicate_column(e: &rusqlite::Error) -> bool {
    e.to_string().contains("duplicate column name")
}
