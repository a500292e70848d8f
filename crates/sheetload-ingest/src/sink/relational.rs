//! Batching sink that writes cells to a relational destination.

use super::staging::{sheet_ids, StagingBuffer};
use super::{format_elapsed, IngestSink};
use crate::error::IngestResult;
use crate::fingerprint::hash_file;
use crate::readers::HeaderFooter;
use chrono::Local;
use sheetload_core::{
    CellRecord, CellValue, ContentHash, FileRecord, Flow, SheetId, SheetIdentity,
};
use sheetload_db::Database;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Registry and bulk-write capability of a destination.
pub trait Destination {
    /// Register `identity`, returning its new id (>= 1), or 0 when it was
    /// already loaded.
    fn lookup_or_register_sheet(&mut self, identity: &SheetIdentity) -> IngestResult<SheetId>;

    /// Write `cells` in one all-or-nothing operation.
    fn write_cells(&mut self, cells: &[CellRecord]) -> IngestResult<usize>;

    /// Unregister sheets so their content loads again next run.
    fn forget_sheets(&mut self, ids: &[SheetId]) -> IngestResult<usize>;
}

/// Opens a [`Destination`] when a run starts.
pub trait Connector {
    type Conn: Destination;

    fn connect(&mut self) -> IngestResult<Self::Conn>;
}

impl Destination for Database {
    fn lookup_or_register_sheet(&mut self, identity: &SheetIdentity) -> IngestResult<SheetId> {
        Ok(Database::lookup_or_register_sheet(self, identity)?)
    }

    fn write_cells(&mut self, cells: &[CellRecord]) -> IngestResult<usize> {
        Ok(self.insert_cells(cells)?)
    }

    fn forget_sheets(&mut self, ids: &[SheetId]) -> IngestResult<usize> {
        Ok(Database::forget_sheets(self, ids)?)
    }
}

/// Connects to a SQLite database file, creating it when missing.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for SqliteConnector {
    type Conn = Database;

    fn connect(&mut self) -> IngestResult<Database> {
        Ok(Database::open(&self.path)?)
    }
}

/// Counters kept by [`RelationalSink`] over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub sheets_loaded: usize,
    pub sheets_skipped: usize,
    pub lookup_failures: usize,
    pub fingerprint_failures: usize,
    pub cells_written: usize,
    pub cells_dropped: usize,
    pub flushes: usize,
    pub flush_failures: usize,
}

/// State of the file currently being loaded.
struct FileState {
    file_name: String,
    hash: Option<ContentHash>,
    sheet: Option<SheetId>,
    registered: Vec<SheetId>,
    /// Sheets whose cells were lost in a failed flush.
    dropped: HashSet<SheetId>,
}

/// Loads sheets into a relational destination, skipping content already
/// registered under the same (file name, sheet name, hash) identity.
///
/// Cells are staged in memory and written in bulk whenever `batch_size`
/// cells accumulate, at each file boundary and at finish. A failed write
/// drops that batch and unregisters its sheets, so the content is picked
/// up again by the next run.
pub struct RelationalSink<C: Connector> {
    connector: C,
    destination: Option<C::Conn>,
    batch_size: usize,
    buffer: StagingBuffer,
    file: Option<FileState>,
    started: Option<Instant>,
    stats: SinkStats,
}

impl<C: Connector> RelationalSink<C> {
    pub fn new(connector: C, batch_size: usize) -> Self {
        Self {
            connector,
            destination: None,
            batch_size: batch_size.max(1),
            buffer: StagingBuffer::new(),
            file: None,
            started: None,
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    /// Cells staged and not yet written.
    pub fn staged(&self) -> usize {
        self.buffer.len()
    }

    /// Write every staged cell in one bulk operation. The buffer is empty
    /// afterwards whether or not the write succeeded.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let cells = self.buffer.take();
        let file_name = self
            .file
            .as_ref()
            .map(|f| f.file_name.as_str())
            .unwrap_or("<none>");

        let Some(destination) = self.destination.as_mut() else {
            error!(
                "No destination connection; dropping {} cells of {}",
                cells.len(),
                file_name
            );
            self.stats.cells_dropped += cells.len();
            return;
        };

        match destination.write_cells(&cells) {
            Ok(written) => {
                self.stats.cells_written += written;
                self.stats.flushes += 1;
                debug!("Flushed {} cells of {}", written, file_name);
            }
            Err(e) => {
                let ids = sheet_ids(&cells);
                error!(
                    "Bulk write of {} cells of {} failed: {}",
                    cells.len(),
                    file_name,
                    e
                );
                self.stats.flush_failures += 1;
                self.stats.cells_dropped += cells.len();

                match destination.forget_sheets(&ids) {
                    Ok(_) => info!("Unregistered sheets {:?}; they load again next run", ids),
                    Err(e) => error!("Could not unregister sheets {:?}: {}", ids, e),
                }
                if let Some(state) = self.file.as_mut() {
                    state.dropped.extend(ids);
                }
            }
        }
    }
}

impl<C: Connector> IngestSink for RelationalSink<C> {
    fn on_init(&mut self) -> IngestResult<()> {
        self.started = Some(Instant::now());
        let destination = self.connector.connect()?;
        self.destination = Some(destination);
        info!("Destination connected, batch size {}", self.batch_size);
        Ok(())
    }

    fn on_finish(&mut self) -> IngestResult<()> {
        self.flush();
        self.file = None;
        self.destination = None;

        let elapsed = self.started.take().map(|s| s.elapsed()).unwrap_or_default();
        info!(
            "Finished {} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            format_elapsed(elapsed)
        );
        info!(
            "Sheets loaded {}, already loaded {}, cells written {}, dropped {}",
            self.stats.sheets_loaded,
            self.stats.sheets_skipped,
            self.stats.cells_written,
            self.stats.cells_dropped
        );
        Ok(())
    }

    fn on_file(&mut self, file: &FileRecord) -> Flow {
        // Cells of the previous file never share a batch with this one.
        self.flush();
        self.file = None;

        let hash = if file.format().is_some() {
            match hash_file(&file.path) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!("Cannot fingerprint {}: {}; skipping file", file.path.display(), e);
                    self.stats.fingerprint_failures += 1;
                    return Flow::Skip;
                }
            }
        } else {
            None
        };

        self.file = Some(FileState {
            file_name: file.file_name(),
            hash,
            sheet: None,
            registered: Vec::new(),
            dropped: HashSet::new(),
        });
        Flow::Continue
    }

    fn on_sheet(&mut self, sheet_name: &str) -> Flow {
        let Some(state) = self.file.as_mut() else {
            return Flow::Skip;
        };
        state.sheet = None;

        let Some(hash) = state.hash.clone() else {
            return Flow::Skip;
        };
        let Some(destination) = self.destination.as_mut() else {
            warn!("No destination connection; skipping sheet '{}'", sheet_name);
            return Flow::Skip;
        };

        let identity = SheetIdentity::new(state.file_name.clone(), sheet_name, hash);
        match destination.lookup_or_register_sheet(&identity) {
            Ok(id) if id >= 1 => {
                info!("Loading {} as sheet #{}", identity, id);
                state.sheet = Some(id);
                state.registered.push(id);
                self.stats.sheets_loaded += 1;
                Flow::Continue
            }
            Ok(_) => {
                info!("Already loaded {}; skipping", identity);
                self.stats.sheets_skipped += 1;
                Flow::Skip
            }
            Err(e) => {
                warn!("Registry lookup failed for {}: {}; skipping", identity, e);
                self.stats.lookup_failures += 1;
                Flow::Skip
            }
        }
    }

    fn on_row(&mut self, row: usize, _field_count: usize, header: Option<&HeaderFooter>) -> Flow {
        if row == 0 {
            if let Some(hf) = header {
                debug!("Sheet header {:?} footer {:?}", hf.header, hf.footer);
            }
        }
        Flow::Continue
    }

    fn on_col(&mut self, col: usize, row: usize, value: &CellValue) -> Flow {
        let Some(state) = self.file.as_ref() else {
            return Flow::Continue;
        };
        let Some(sheet_id) = state.sheet else {
            return Flow::Continue;
        };
        if state.dropped.contains(&sheet_id) {
            self.stats.cells_dropped += 1;
            return Flow::Continue;
        }

        self.buffer.push(CellRecord::new(sheet_id, row, col, value));
        if self.buffer.len() >= self.batch_size {
            self.flush();
        }
        Flow::Continue
    }

    fn on_file_abandoned(&mut self, file: &FileRecord) {
        let discarded = self.buffer.discard();
        self.stats.cells_dropped += discarded;
        warn!(
            "Abandoned {}; discarded {} staged cells",
            file.file_name(),
            discarded
        );

        let Some(state) = self.file.take() else {
            return;
        };
        if state.registered.is_empty() {
            return;
        }
        if let Some(destination) = self.destination.as_mut() {
            match destination.forget_sheets(&state.registered) {
                Ok(_) => info!(
                    "Unregistered sheets {:?} of {}",
                    state.registered, state.file_name
                ),
                Err(e) => error!(
                    "Could not unregister sheets {:?} of {}: {}",
                    state.registered, state.file_name, e
                ),
            }
        }
    }
}
