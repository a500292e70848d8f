//! Database migrations and schema management.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating initial database schema...");
        create_initial_schema(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- Identity registry: one row per loaded (file, sheet, content)
        CREATE TABLE IF NOT EXISTS sheets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT NOT NULL,
            sheet_name TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            registered_at TEXT NOT NULL,
            UNIQUE (file_name, sheet_name, content_hash)
        );

        CREATE INDEX IF NOT EXISTS idx_sheets_hash ON sheets(content_hash);

        -- Cell values, NULL for empty cells
        CREATE TABLE IF NOT EXISTS cells (
            sheet_id INTEGER NOT NULL REFERENCES sheets(id) ON DELETE CASCADE,
            row_index INTEGER NOT NULL,
            col_index INTEGER NOT NULL,
            value TEXT,
            PRIMARY KEY (sheet_id, row_index, col_index)
        );
        "#,
    )?;

    Ok(())
}
