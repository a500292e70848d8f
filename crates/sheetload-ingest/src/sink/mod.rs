//! Consumers of the ingestion event stream.

mod relational;
mod staging;
mod trace;

pub use relational::{Connector, Destination, RelationalSink, SinkStats, SqliteConnector};
pub use staging::StagingBuffer;
pub use trace::TraceSink;

use crate::error::IngestResult;
use crate::readers::HeaderFooter;
use sheetload_core::{CellValue, FileRecord, Flow};
use std::time::Duration;

/// Receives lifecycle and cell events from the [`FileLoader`](crate::FileLoader).
///
/// Events arrive strictly in file, sheet, row, column order. The returned
/// [`Flow`] steers the loader:
///
/// - `on_file`: `Skip` leaves the file unopened.
/// - `on_sheet`: `Skip` abandons that sheet's rows; the next sheet still arrives.
/// - `on_row`: `Skip` suppresses the row's column events.
/// - `on_col`: `Skip` ends the current row; `Abort` stops the whole file.
///
/// `Abort` from any per-file event stops the file and reports it through
/// [`on_file_abandoned`](IngestSink::on_file_abandoned).
pub trait IngestSink {
    /// Called once before any file. An error aborts the run.
    fn on_init(&mut self) -> IngestResult<()>;

    /// Called once after the last file.
    fn on_finish(&mut self) -> IngestResult<()>;

    fn on_file(&mut self, file: &FileRecord) -> Flow;

    fn on_sheet(&mut self, sheet_name: &str) -> Flow;

    fn on_row(&mut self, row: usize, field_count: usize, header: Option<&HeaderFooter>) -> Flow;

    fn on_col(&mut self, col: usize, row: usize, value: &CellValue) -> Flow;

    /// The file failed mid-read or was aborted; nothing more will arrive for it.
    fn on_file_abandoned(&mut self, _file: &FileRecord) {}
}

impl<S: IngestSink + ?Sized> IngestSink for Box<S> {
    fn on_init(&mut self) -> IngestResult<()> {
        (**self).on_init()
    }

    fn on_finish(&mut self) -> IngestResult<()> {
        (**self).on_finish()
    }

    fn on_file(&mut self, file: &FileRecord) -> Flow {
        (**self).on_file(file)
    }

    fn on_sheet(&mut self, sheet_name: &str) -> Flow {
        (**self).on_sheet(sheet_name)
    }

    fn on_row(&mut self, row: usize, field_count: usize, header: Option<&HeaderFooter>) -> Flow {
        (**self).on_row(row, field_count, header)
    }

    fn on_col(&mut self, col: usize, row: usize, value: &CellValue) -> Flow {
        (**self).on_col(col, row, value)
    }

    fn on_file_abandoned(&mut self, file: &FileRecord) {
        (**self).on_file_abandoned(file)
    }
}

/// Render a duration as `hh:mm:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
