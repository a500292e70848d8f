//! Sink that only logs the event stream.

use super::{format_elapsed, IngestSink};
use crate::error::IngestResult;
use crate::readers::HeaderFooter;
use chrono::Local;
use sheetload_core::{CellValue, FileRecord, Flow};
use std::time::Instant;
use tracing::info;

/// Logs one line per event and never skips or aborts.
#[derive(Debug, Default)]
pub struct TraceSink {
    started: Option<Instant>,
    events: u64,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of file, sheet, row and column events seen so far.
    pub fn events_seen(&self) -> u64 {
        self.events
    }
}

impl IngestSink for TraceSink {
    fn on_init(&mut self) -> IngestResult<()> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn on_finish(&mut self) -> IngestResult<()> {
        let elapsed = self.started.take().map(|s| s.elapsed()).unwrap_or_default();
        info!(
            "Finished {} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            format_elapsed(elapsed)
        );
        Ok(())
    }

    fn on_file(&mut self, file: &FileRecord) -> Flow {
        self.events += 1;
        info!("File {}", file.file_name());
        Flow::Continue
    }

    fn on_sheet(&mut self, sheet_name: &str) -> Flow {
        self.events += 1;
        info!("Sheet '{}'", sheet_name);
        Flow::Continue
    }

    fn on_row(&mut self, row: usize, field_count: usize, header: Option<&HeaderFooter>) -> Flow {
        self.events += 1;
        if row == 0 && header.is_some() {
            info!("Contains header!");
        }
        info!("Row {} FieldCount {}", row, field_count);
        Flow::Continue
    }

    fn on_col(&mut self, col: usize, _row: usize, value: &CellValue) -> Flow {
        self.events += 1;
        info!("Column {} Type {} Value {}", col, value.cell_type(), value);
        Flow::Continue
    }
}
