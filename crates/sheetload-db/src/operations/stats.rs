//! Database statistics operations.

use crate::database::Database;
use crate::error::DbResult;
use sheetload_core::DatabaseStats;
use std::collections::HashMap;

impl Database {
    /// Get destination statistics.
    pub fn get_stats(&self) -> DbResult<DatabaseStats> {
        let conn = self.conn()?;

        let total_sheets: i64 = conn.query_row("SELECT COUNT(*) FROM sheets", [], |row| row.get(0))?;

        // A file is one (name, content) pair
        let total_files: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT file_name, content_hash FROM sheets)",
            [],
            |row| row.get(0),
        )?;

        let total_cells: i64 = conn.query_row("SELECT COUNT(*) FROM cells", [], |row| row.get(0))?;

        let null_cells: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cells WHERE value IS NULL",
            [],
            |row| row.get(0),
        )?;

        let mut sheets_by_file = HashMap::new();
        {
            let mut stmt =
                conn.prepare("SELECT file_name, COUNT(*) FROM sheets GROUP BY file_name")?;
            let rows = stmt.query_map([], |row| {
                let file_name: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((file_name, count))
            })?;
            for row in rows {
                let (file_name, count) = row?;
                sheets_by_file.insert(file_name, count);
            }
        }

        // Database size (page_count * page_size)
        let page_count: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
        let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;

        Ok(DatabaseStats {
            total_sheets,
            total_files,
            total_cells,
            null_cells,
            sheets_by_file,
            database_size_bytes: page_count * page_size,
        })
    }
}
