//! The ingestion orchestrator.

use crate::error::IngestResult;
use crate::readers::open_reader;
use crate::scanner::{DirectoryScan, DirectoryScanner};
use crate::sink::IngestSink;
use sheetload_config::LoadConfig;
use sheetload_core::{FileRecord, Flow, TabularFormat};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where to look for files and how to read them.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub root: PathBuf,
    pub recursive: bool,
    pub pattern: String,
    pub look_ahead_rows: usize,
}

impl LoadOptions {
    /// Options for `root` with default discovery settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(&LoadConfig::default(), root)
    }

    pub fn from_config(config: &LoadConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: config.recursive,
            pattern: config.pattern.clone(),
            look_ahead_rows: config.look_ahead_rows,
        }
    }
}

/// How one file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Every sheet was read to its end.
    Loaded,
    /// Not a tabular format; nothing to read.
    Unsupported,
    /// The sink declined the file.
    Skipped,
    /// The sink stopped the file part way.
    Aborted,
    /// The file could not be opened or read.
    Failed,
}

impl FileOutcome {
    /// Whether the file counts as successfully processed.
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Loaded | FileOutcome::Unsupported)
    }
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Successfully processed files, unsupported ones included.
    pub processed: usize,
    pub unsupported: usize,
    pub skipped: usize,
    pub aborted: usize,
    pub failed: usize,
    /// Directories that could not be listed.
    pub scan_failures: usize,
    pub elapsed: Duration,
}

impl LoadSummary {
    fn record(&mut self, outcome: FileOutcome) {
        if outcome.is_success() {
            self.processed += 1;
        }
        match outcome {
            FileOutcome::Loaded => {}
            FileOutcome::Unsupported => self.unsupported += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Aborted => self.aborted += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

/// Drives discovery and reading, pumping each file's sheets, rows and cells
/// into a sink.
///
/// A file that fails or is aborted never stops the run: the loader moves on
/// to the next path. Only a sink that cannot start aborts the whole run.
pub struct FileLoader<S: IngestSink> {
    options: LoadOptions,
    sink: S,
}

impl<S: IngestSink> FileLoader<S> {
    pub fn new(options: LoadOptions, sink: S) -> Self {
        Self { options, sink }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Discover candidate files without reading them.
    pub fn scan(&self) -> IngestResult<DirectoryScan> {
        let scanner = DirectoryScanner::new(&self.options.pattern, self.options.recursive)?;
        Ok(scanner.scan(&self.options.root))
    }

    /// Scan the root and load every file found.
    pub fn load_files(&mut self) -> IngestResult<LoadSummary> {
        let scan = self.scan()?;
        info!(
            "Found {} files under {}",
            scan.files.len(),
            self.options.root.display()
        );

        self.load_scan(&scan)
    }

    /// Load the files of a finished scan, carrying its failure count into the summary.
    pub fn load_scan(&mut self, scan: &DirectoryScan) -> IngestResult<LoadSummary> {
        let mut summary = self.run(&scan.files)?;
        summary.scan_failures = scan.failures.len();
        Ok(summary)
    }

    /// Load `paths` in order.
    ///
    /// The sink sees `on_init` once before the first file and `on_finish`
    /// once after the last.
    pub fn run(&mut self, paths: &[PathBuf]) -> IngestResult<LoadSummary> {
        let started = Instant::now();
        self.sink.on_init()?;

        let mut summary = LoadSummary::default();
        for path in paths {
            info!("Processing file '{}'", path.display());
            let outcome = self.load_file(path);
            debug!("{} -> {:?}", path.display(), outcome);
            summary.record(outcome);
        }

        if let Err(e) = self.sink.on_finish() {
            error!("Sink failed to finish: {}", e);
        }

        summary.elapsed = started.elapsed();
        info!(
            "Processed {} of {} files in {:.2?}",
            summary.processed,
            paths.len(),
            summary.elapsed
        );
        Ok(summary)
    }

    /// Load a single file, folding every failure into the outcome.
    pub fn load_file(&mut self, path: &Path) -> FileOutcome {
        let file = match FileRecord::from_path(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot open {}: {}", path.display(), e);
                return FileOutcome::Failed;
            }
        };
        info!("Extension '{}' Size={}", file.extension, file.byte_length);

        match self.sink.on_file(&file) {
            Flow::Continue => {}
            Flow::Skip => {
                debug!("Sink skipped {}", file.file_name());
                return FileOutcome::Skipped;
            }
            Flow::Abort => {
                self.sink.on_file_abandoned(&file);
                return FileOutcome::Aborted;
            }
        }

        let Some(format) = file.format() else {
            if TabularFormat::is_excluded_extension(&file.extension) {
                info!("'{}' files are not supported yet", file.extension);
            } else {
                debug!("Unrecognized extension '{}'", file.extension);
            }
            return FileOutcome::Unsupported;
        };

        match self.pump(&file, format) {
            Ok(FileOutcome::Aborted) => {
                info!("Aborted {}", file.file_name());
                self.sink.on_file_abandoned(&file);
                FileOutcome::Aborted
            }
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                self.sink.on_file_abandoned(&file);
                FileOutcome::Failed
            }
        }
    }

    /// Stream every sheet, row and cell of `file` into the sink. The reader
    /// is closed when this returns, whatever the outcome.
    fn pump(&mut self, file: &FileRecord, format: TabularFormat) -> IngestResult<FileOutcome> {
        let mut reader = open_reader(format, &file.path, self.options.look_ahead_rows)?;
        debug!(
            "{} has {} sheet(s)",
            file.file_name(),
            reader.sheet_count()
        );

        while reader.next_sheet()? {
            match self.sink.on_sheet(reader.sheet_name()) {
                Flow::Continue => {}
                Flow::Skip => continue,
                Flow::Abort => return Ok(FileOutcome::Aborted),
            }

            let mut row = 0;
            while reader.read_row()? {
                let field_count = reader.field_count();
                match self.sink.on_row(row, field_count, reader.header_footer()) {
                    Flow::Continue => {
                        for col in 0..field_count {
                            match self.sink.on_col(col, row, reader.cell(col)) {
                                Flow::Continue => {}
                                Flow::Skip => break,
                                Flow::Abort => return Ok(FileOutcome::Aborted),
                            }
                        }
                    }
                    Flow::Skip => {}
                    Flow::Abort => return Ok(FileOutcome::Aborted),
                }
                row += 1;
            }
        }

        Ok(FileOutcome::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::HeaderFooter;
    use sheetload_core::CellValue;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Init,
        File(String),
        Sheet(String),
        Row(usize, usize),
        Col(usize, usize, CellValue),
        Abandoned(String),
        Finish,
    }

    /// Records events and answers from a script of (matcher, flow) rules.
    #[derive(Default)]
    struct ScriptedSink {
        events: Vec<Event>,
        skip_sheets: Vec<String>,
        skip_files: Vec<String>,
        abort_at_col: Option<(usize, usize)>,
        skip_after_col: Option<usize>,
        fail_init: bool,
    }

    impl IngestSink for ScriptedSink {
        fn on_init(&mut self) -> IngestResult<()> {
            if self.fail_init {
                return Err(crate::IngestError::Connection("refused".into()));
            }
            self.events.push(Event::Init);
            Ok(())
        }

        fn on_finish(&mut self) -> IngestResult<()> {
            self.events.push(Event::Finish);
            Ok(())
        }

        fn on_file(&mut self, file: &FileRecord) -> Flow {
            let name = file.file_name();
            self.events.push(Event::File(name.clone()));
            if self.skip_files.contains(&name) {
                Flow::Skip
            } else {
                Flow::Continue
            }
        }

        fn on_sheet(&mut self, sheet_name: &str) -> Flow {
            self.events.push(Event::Sheet(sheet_name.to_string()));
            if self.skip_sheets.iter().any(|s| s == sheet_name) {
                Flow::Skip
            } else {
                Flow::Continue
            }
        }

        fn on_row(&mut self, row: usize, field_count: usize, _: Option<&HeaderFooter>) -> Flow {
            self.events.push(Event::Row(row, field_count));
            Flow::Continue
        }

        fn on_col(&mut self, col: usize, row: usize, value: &CellValue) -> Flow {
            self.events.push(Event::Col(col, row, value.clone()));
            if self.abort_at_col == Some((col, row)) {
                return Flow::Abort;
            }
            if self.skip_after_col == Some(col) {
                return Flow::Skip;
            }
            Flow::Continue
        }

        fn on_file_abandoned(&mut self, file: &FileRecord) {
            self.events.push(Event::Abandoned(file.file_name()));
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn loader(dir: &TempDir, sink: ScriptedSink) -> FileLoader<ScriptedSink> {
        FileLoader::new(LoadOptions::new(dir.path()), sink)
    }

    fn cols(events: &[Event]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Col(c, r, _) => Some((*c, *r)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_event_order_for_csv() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.csv", "1,2\n3,4\n");

        let mut loader = loader(&dir, ScriptedSink::default());
        let summary = loader.run(&[a]).unwrap();
        assert_eq!(summary.processed, 1);

        let events = loader.into_sink().events;
        assert_eq!(
            events,
            vec![
                Event::Init,
                Event::File("a.csv".into()),
                Event::Sheet("a".into()),
                Event::Row(0, 2),
                Event::Col(0, 0, CellValue::Number(1.0)),
                Event::Col(1, 0, CellValue::Number(2.0)),
                Event::Row(1, 2),
                Event::Col(0, 1, CellValue::Number(3.0)),
                Event::Col(1, 1, CellValue::Number(4.0)),
                Event::Finish,
            ]
        );
    }

    #[test]
    fn test_column_abort_stops_file_only() {
        let dir = TempDir::new().unwrap();
        let wide = "0,1,2,3,4\n".repeat(8);
        let a = write(&dir, "a.csv", &wide);
        let b = write(&dir, "b.csv", "x\n");

        let sink = ScriptedSink {
            abort_at_col: Some((3, 5)),
            ..Default::default()
        };
        let mut loader = loader(&dir, sink);
        let summary = loader.run(&[a, b]).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.aborted, 1);

        let events = loader.into_sink().events;
        let seen = cols(&events);
        assert_eq!(seen.last(), Some(&(0, 0)));
        assert!(!seen.contains(&(4, 5)));
        assert!(!seen.iter().any(|&(_, r)| r == 6));
        assert!(events.contains(&Event::Abandoned("a.csv".into())));
        assert!(events.contains(&Event::File("b.csv".into())));
        assert_eq!(events.last(), Some(&Event::Finish));
    }

    #[test]
    fn test_column_abort_skips_remaining_sheets() {
        let dir = TempDir::new().unwrap();
        let mut wb = rust_xlsxwriter::Workbook::new();
        let a = wb.add_worksheet().set_name("A").unwrap();
        for row in 0..8u32 {
            for col in 0..5u16 {
                a.write_number(row, col, f64::from(col)).unwrap();
            }
        }
        wb.add_worksheet()
            .set_name("B")
            .unwrap()
            .write_number(0, 0, 1.0)
            .unwrap();
        let path = dir.path().join("multi.xlsx");
        wb.save(&path).unwrap();

        let sink = ScriptedSink {
            abort_at_col: Some((3, 5)),
            ..Default::default()
        };
        let mut loader = loader(&dir, sink);
        let summary = loader.run(&[path]).unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.aborted, 1);

        let events = loader.into_sink().events;
        assert_eq!(cols(&events).last(), Some(&(3, 5)));
        assert!(!events.contains(&Event::Row(6, 5)));
        assert!(!events.contains(&Event::Sheet("B".into())));
        assert!(events.contains(&Event::Abandoned("multi.xlsx".into())));
    }

    #[test]
    fn test_column_skip_ends_row() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.csv", "1,2,3\n4,5,6\n");

        let sink = ScriptedSink {
            skip_after_col: Some(1),
            ..Default::default()
        };
        let mut loader = loader(&dir, sink);
        loader.run(&[a]).unwrap();

        assert_eq!(
            cols(&loader.sink().events),
            vec![(0, 0), (1, 0), (0, 1), (1, 1)]
        );
    }

    #[test]
    fn test_sheet_skip_moves_to_next_sheet() {
        let dir = TempDir::new().unwrap();
        let mut wb = rust_xlsxwriter::Workbook::new();
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            wb.add_worksheet()
                .set_name(*name)
                .unwrap()
                .write_number(0, 0, i as f64)
                .unwrap();
        }
        let path = dir.path().join("book.xlsx");
        wb.save(&path).unwrap();

        let sink = ScriptedSink {
            skip_sheets: vec!["B".into()],
            ..Default::default()
        };
        let mut loader = loader(&dir, sink);
        let summary = loader.run(&[path]).unwrap();
        assert_eq!(summary.processed, 1);

        let events = loader.into_sink().events;
        let after_b: Vec<&Event> = events
            .iter()
            .skip_while(|e| **e != Event::Sheet("B".into()))
            .skip(1)
            .collect();
        assert_eq!(after_b.first(), Some(&&Event::Sheet("C".into())));
        assert!(events.contains(&Event::Col(0, 0, CellValue::Number(2.0))));
        assert!(!events.contains(&Event::Col(0, 0, CellValue::Number(1.0))));
    }

    #[test]
    fn test_file_skip_is_not_counted() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.csv", "1\n");
        let b = write(&dir, "b.csv", "2\n");

        let sink = ScriptedSink {
            skip_files: vec!["a.csv".into()],
            ..Default::default()
        };
        let mut loader = loader(&dir, sink);
        let summary = loader.run(&[a, b]).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!loader.sink().events.contains(&Event::Sheet("a".into())));
    }

    #[test]
    fn test_unsupported_files_succeed_without_rows() {
        let dir = TempDir::new().unwrap();
        let notes = write(&dir, "notes.txt", "hello");
        let readme = write(&dir, "readme.md", "# hi");

        let mut loader = loader(&dir, ScriptedSink::default());
        let summary = loader.run(&[notes, readme]).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.unsupported, 2);
        assert!(!loader
            .sink()
            .events
            .iter()
            .any(|e| matches!(e, Event::Sheet(_))));
    }

    #[test]
    fn test_corrupt_workbook_fails_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.xlsx", "not a workbook");
        let good = write(&dir, "good.csv", "1\n");

        let mut loader = loader(&dir, ScriptedSink::default());
        let summary = loader.run(&[bad, good]).unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 1);
        let events = &loader.sink().events;
        assert!(events.contains(&Event::Abandoned("bad.xlsx".into())));
        assert!(events.contains(&Event::Sheet("good".into())));
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let mut loader = loader(&dir, ScriptedSink::default());
        let summary = loader.run(&[dir.path().join("gone.csv")]).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 0);
    }

    #[test]
    fn test_init_failure_aborts_run() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.csv", "1\n");
        let sink = ScriptedSink {
            fail_init: true,
            ..Default::default()
        };
        let mut loader = loader(&dir, sink);

        assert!(loader.run(&[a]).is_err());
        assert!(loader.sink().events.is_empty());
    }

    #[test]
    fn test_missing_root_still_runs_sink() {
        let dir = TempDir::new().unwrap();
        let options = LoadOptions::new(dir.path().join("missing"));
        let mut loader = FileLoader::new(options, ScriptedSink::default());

        let summary = loader.load_files().unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.scan_failures, 1);
        assert_eq!(loader.sink().events, vec![Event::Init, Event::Finish]);
    }

    #[test]
    fn test_load_files_scans_root() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.csv", "1,2\n");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.csv"), "3\n").unwrap();

        let mut loader = loader(&dir, ScriptedSink::default());
        let summary = loader.load_files().unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.scan_failures, 0);
        let files: Vec<&Event> = loader
            .sink()
            .events
            .iter()
            .filter(|e| matches!(e, Event::File(_)))
            .collect();
        assert_eq!(
            files,
            vec![&Event::File("a.csv".into()), &Event::File("b.csv".into())]
        );
    }
}
