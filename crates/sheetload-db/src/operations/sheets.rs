//! Sheet identity registry operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use rusqlite::params;
use sheetload_core::{SheetId, SheetIdentity, SheetRecord};
use tracing::debug;

const SHEET_COLUMNS: &str = "s.id, s.file_name, s.sheet_name, s.content_hash, s.registered_at,
     (SELECT COUNT(*) FROM cells c WHERE c.sheet_id = s.id)";

impl Database {
    /// Register a sheet identity, or report that it is already known.
    ///
    /// Returns the new registry id (always >= 1) for an unseen identity and
    /// `0` when the exact (file name, sheet name, content hash) was loaded before.
    pub fn lookup_or_register_sheet(&self, identity: &SheetIdentity) -> DbResult<SheetId> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO sheets (file_name, sheet_name, content_hash, registered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                identity.file_name,
                identity.sheet_name,
                identity.content_hash.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            debug!("Sheet identity already registered: {}", identity);
            return Ok(0);
        }

        Ok(conn.last_insert_rowid())
    }

    /// Remove registry rows, and their cells, so the content loads again next run.
    pub fn forget_sheets(&self, ids: &[SheetId]) -> DbResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut removed = 0;

        {
            let mut stmt = tx.prepare("DELETE FROM sheets WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }

        tx.commit()?;
        Ok(removed)
    }

    /// Get a registered sheet by id.
    pub fn get_sheet(&self, id: SheetId) -> DbResult<SheetRecord> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM sheets s WHERE s.id = ?1", SHEET_COLUMNS),
            params![id],
            row_to_sheet,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("Sheet not found: {}", id))
            }
            _ => DbError::from(e),
        })
    }

    /// List registered sheets, newest first.
    pub fn list_sheets(&self, limit: Option<i64>) -> DbResult<Vec<SheetRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sheets s ORDER BY s.id DESC LIMIT ?1",
            SHEET_COLUMNS
        ))?;

        let rows = stmt.query_map(params![limit.unwrap_or(-1)], row_to_sheet)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn row_to_sheet(row: &rusqlite::Row) -> rusqlite::Result<SheetRecord> {
    let registered_at_str: String = row.get(4)?;

    Ok(SheetRecord {
        id: row.get(0)?,
        file_name: row.get(1)?,
        sheet_name: row.get(2)?,
        content_hash: row.get(3)?,
        registered_at: DateTime::parse_from_rfc3339(&registered_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        cell_count: row.get(5)?,
    })
}
