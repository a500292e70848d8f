//! Sheetload Ingest - incremental, content-addressed tabular ingestion.
//!
//! This crate provides:
//! - Breadth-first directory scanning with per-directory fault isolation
//! - Content fingerprints (SHA-256) that drive reload/skip decisions
//! - CSV and XLSX readers behind one sheet/row/cell contract
//! - The `FileLoader` orchestrator pumping reader events into a sink
//! - A trace sink and a batching relational sink

mod error;
mod fingerprint;
mod loader;
mod readers;
mod scanner;
mod sink;

pub use error::{IngestError, IngestResult};
pub use fingerprint::hash_file;
pub use loader::{FileLoader, FileOutcome, LoadOptions, LoadSummary};
pub use readers::{open_reader, CsvReader, HeaderFooter, TabularReader, WorkbookReader};
pub use scanner::{DirectoryScan, DirectoryScanner, ScanFailure};
pub use sink::{
    format_elapsed, Connector, Destination, IngestSink, RelationalSink, SinkStats,
    SqliteConnector, StagingBuffer, TraceSink,
};
