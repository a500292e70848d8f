//! Tabular readers: one sheet/row/cell cursor shape over every supported format.

mod csv;
mod workbook;

pub use self::csv::CsvReader;
pub use self::workbook::WorkbookReader;

use crate::error::IngestResult;
use sheetload_core::{CellValue, TabularFormat};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Returned for any column past the end of the current row.
pub(crate) static NULL_CELL: CellValue = CellValue::Null;

/// Print header and footer text attached to a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFooter {
    pub header: Option<String>,
    pub footer: Option<String>,
}

/// Cursor over the sheets, rows and cells of an open tabular file.
///
/// A fresh reader sits before its first sheet; call [`next_sheet`] to enter
/// it. Within a sheet, [`read_row`] advances to the next row and the cell
/// accessors describe that row until the next call.
///
/// [`next_sheet`]: TabularReader::next_sheet
/// [`read_row`]: TabularReader::read_row
pub trait TabularReader {
    /// Number of sheets in the file.
    fn sheet_count(&self) -> usize;

    /// Advance to the next sheet. Returns `false` when no sheets remain.
    fn next_sheet(&mut self) -> IngestResult<bool>;

    /// Name of the current sheet.
    fn sheet_name(&self) -> &str;

    /// Advance to the next row of the current sheet. Returns `false` at the end.
    fn read_row(&mut self) -> IngestResult<bool>;

    /// Number of cells the current row delivers.
    fn field_count(&self) -> usize;

    /// Cell of the current row; `Null` past the end of the row.
    fn cell(&self, col: usize) -> &CellValue;

    /// Header/footer metadata of the current sheet, if the format carries any.
    ///
    /// CSV has none, and calamine does not surface worksheet print headers,
    /// so both built-in readers keep this default.
    fn header_footer(&self) -> Option<&HeaderFooter> {
        None
    }
}

/// Open `path` with the reader strategy for `format`.
pub fn open_reader(
    format: TabularFormat,
    path: &Path,
    look_ahead_rows: usize,
) -> IngestResult<Box<dyn TabularReader>> {
    let file = File::open(path)?;
    let reader: Box<dyn TabularReader> = match format {
        TabularFormat::Csv => Box::new(CsvReader::new(file, path, look_ahead_rows)?),
        TabularFormat::Workbook => Box::new(WorkbookReader::new(BufReader::new(file))?),
    };
    Ok(reader)
}
