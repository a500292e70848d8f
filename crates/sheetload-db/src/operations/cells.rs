//! Cell bulk write operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use rusqlite::params;
use sheetload_core::{CellRecord, SheetId};

impl Database {
    /// Write a batch of cells in one transaction. Either every cell lands or none do.
    pub fn insert_cells(&self, cells: &[CellRecord]) -> DbResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO cells (sheet_id, row_index, col_index, value)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;

            for cell in cells {
                stmt.execute(params![cell.sheet_id, cell.row, cell.col, cell.value])?;
            }
        }

        tx.commit()?;
        Ok(cells.len())
    }

    /// Get the cells of a sheet in row, then column order.
    pub fn cells_for_sheet(&self, sheet_id: SheetId) -> DbResult<Vec<CellRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT sheet_id, row_index, col_index, value
             FROM cells WHERE sheet_id = ?1 ORDER BY row_index, col_index",
        )?;

        let cells = stmt.query_map(params![sheet_id], |row| {
            Ok(CellRecord {
                sheet_id: row.get(0)?,
                row: row.get(1)?,
                col: row.get(2)?,
                value: row.get(3)?,
            })
        })?;

        cells.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get every stored cell in insertion order.
    pub fn all_cells(&self) -> DbResult<Vec<CellRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT sheet_id, row_index, col_index, value FROM cells ORDER BY rowid",
        )?;

        let cells = stmt.query_map([], |row| {
            Ok(CellRecord {
                sheet_id: row.get(0)?,
                row: row.get(1)?,
                col: row.get(2)?,
                value: row.get(3)?,
            })
        })?;

        cells.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}
