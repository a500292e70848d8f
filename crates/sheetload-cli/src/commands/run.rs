//! Run command - scan the incoming folder and load new sheets.

use super::{expand_path, get_paths};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sheetload_config::{AppPaths, Config};
use sheetload_core::{CellValue, FileRecord, Flow, TabularFormat};
use sheetload_ingest::{
    format_elapsed, DirectoryScanner, FileLoader, HeaderFooter, IngestResult, IngestSink,
    LoadOptions, LoadSummary, RelationalSink, SinkStats, SqliteConnector, TraceSink,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Folder to scan (default: [load].directory, then the incoming folder)
    #[arg(short, long)]
    pub dir: Option<String>,

    /// File name pattern, e.g. "*.csv"
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Only scan the top folder
    #[arg(long)]
    pub no_recurse: bool,

    /// CSV rows read ahead to settle the column count
    #[arg(long)]
    pub look_ahead: Option<usize>,

    /// SQLite database receiving the cells
    #[arg(long, env = "SHEETLOAD_DATABASE")]
    pub database: Option<String>,

    /// Only log the event stream; write nothing
    #[arg(long)]
    pub trace: bool,

    /// List the files that would be loaded
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = get_paths()?;
    let config = Config::load_from(&paths.config_file).context("Failed to load config")?;

    let options = load_options(&args, &config, &paths);
    let target = destination(&args, &config, &paths);
    if let Some(summary) = execute(options, target, config.destination.batch_size, args.dry_run)? {
        print_summary(&summary);
    }
    Ok(())
}

/// Scan and load one folder. Returns `None` for a dry run.
///
/// A missing or empty folder is not an error: the run still starts and
/// finishes its sink and reports zero files.
fn execute(
    options: LoadOptions,
    target: Option<PathBuf>,
    batch_size: usize,
    dry_run: bool,
) -> Result<Option<LoadSummary>> {
    println!("{} {}", "Scanning:".cyan(), options.root.display());
    let scanner = DirectoryScanner::new(&options.pattern, options.recursive)?;
    let scan = scanner.scan(&options.root);

    for failure in &scan.failures {
        println!(
            "  {} {}: {}",
            "Unreadable folder".yellow(),
            failure.directory.display(),
            failure.message
        );
    }

    if scan.files.is_empty() {
        println!("{}", "No files found.".yellow());
    } else {
        println!("Found {} files", scan.files.len());
    }

    if dry_run {
        for path in &scan.files {
            println!("  {} [{}]", path.display(), format_label(path));
        }
        println!("\n{}", "Dry run - nothing was loaded.".cyan());
        return Ok(None);
    }

    let summary = match target {
        Some(db_path) => {
            println!("{} {}", "Loading into:".cyan(), db_path.display());
            let sink = ProgressSink {
                inner: RelationalSink::new(SqliteConnector::new(&db_path), batch_size),
                bar: progress_bar(scan.files.len())?,
            };

            let mut loader = FileLoader::new(options, sink);
            let summary = loader.load_scan(&scan).context("Load failed")?;
            print_sink_stats(loader.into_sink().inner.stats());
            summary
        }
        None => {
            println!("{}", "No database configured; tracing events only.".dimmed());
            let mut loader = FileLoader::new(options, TraceSink::new());
            loader.load_scan(&scan).context("Trace failed")?
        }
    };

    Ok(Some(summary))
}

/// Merge command line overrides into the configured load settings.
fn load_options(args: &RunArgs, config: &Config, paths: &AppPaths) -> LoadOptions {
    let root = args
        .dir
        .as_deref()
        .or(config.load.directory.as_deref())
        .map(expand_path)
        .unwrap_or_else(|| paths.incoming_dir.clone());

    let mut options = LoadOptions::from_config(&config.load, root);
    if let Some(ref pattern) = args.pattern {
        options.pattern = pattern.clone();
    }
    if args.no_recurse {
        options.recursive = false;
    }
    if let Some(rows) = args.look_ahead {
        options.look_ahead_rows = rows;
    }
    options
}

/// The database to load into, or `None` to trace only.
fn destination(args: &RunArgs, config: &Config, paths: &AppPaths) -> Option<PathBuf> {
    if args.trace {
        return None;
    }
    if let Some(ref db) = args.database {
        return Some(expand_path(db));
    }
    if let Some(ref db) = config.destination.database {
        return Some(expand_path(db));
    }
    paths.is_initialized().then(|| paths.database_file.clone())
}

fn format_label(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match TabularFormat::from_extension(&ext) {
        Some(format) => format.as_str(),
        None if TabularFormat::is_excluded_extension(&ext) => "not supported yet",
        None => "not tabular",
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn print_sink_stats(stats: &SinkStats) {
    println!();
    println!("{}", "Destination".white().bold());
    println!("  Sheets loaded: {}", stats.sheets_loaded.to_string().green());
    println!("  Already loaded: {}", stats.sheets_skipped);
    println!("  Cells written: {}", stats.cells_written);
    if stats.lookup_failures > 0 {
        println!("  Registry failures: {}", stats.lookup_failures.to_string().red());
    }
    if stats.cells_dropped > 0 {
        println!(
            "  Cells dropped: {} (reloaded next run)",
            stats.cells_dropped.to_string().red()
        );
    }
}

fn print_summary(summary: &LoadSummary) {
    println!();
    println!(
        "{} {} files in {}",
        "Processed".green().bold(),
        summary.processed,
        format_elapsed(summary.elapsed)
    );
    if summary.unsupported > 0 {
        println!("  Not tabular: {}", summary.unsupported);
    }
    if summary.skipped > 0 {
        println!("  Skipped: {}", summary.skipped.to_string().yellow());
    }
    if summary.aborted > 0 {
        println!("  Aborted: {}", summary.aborted.to_string().yellow());
    }
    if summary.failed > 0 {
        println!("  Failed: {}", summary.failed.to_string().red());
    }
    if summary.scan_failures > 0 {
        println!("  Unreadable folders: {}", summary.scan_failures.to_string().red());
    }
}

/// Advances a progress bar as files start, forwarding every event.
struct ProgressSink<S> {
    inner: S,
    bar: ProgressBar,
}

impl<S: IngestSink> IngestSink for ProgressSink<S> {
    fn on_init(&mut self) -> IngestResult<()> {
        self.inner.on_init()
    }

    fn on_finish(&mut self) -> IngestResult<()> {
        self.bar.finish_and_clear();
        self.inner.on_finish()
    }

    fn on_file(&mut self, file: &FileRecord) -> Flow {
        self.bar.set_message(file.file_name());
        self.bar.inc(1);
        self.inner.on_file(file)
    }

    fn on_sheet(&mut self, sheet_name: &str) -> Flow {
        self.inner.on_sheet(sheet_name)
    }

    fn on_row(&mut self, row: usize, field_count: usize, header: Option<&HeaderFooter>) -> Flow {
        self.inner.on_row(row, field_count, header)
    }

    fn on_col(&mut self, col: usize, row: usize, value: &CellValue) -> Flow {
        self.inner.on_col(col, row, value)
    }

    fn on_file_abandoned(&mut self, file: &FileRecord) {
        self.inner.on_file_abandoned(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct RunCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn paths(dir: &TempDir) -> AppPaths {
        AppPaths {
            config_dir: dir.path().join("config"),
            data_dir: dir.path().join("data"),
            config_file: dir.path().join("config").join("config.toml"),
            database_file: dir.path().join("data").join("sheetload.db"),
            incoming_dir: dir.path().join("data").join("incoming"),
        }
    }

    #[test]
    fn test_overrides_win_over_config() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let mut config = Config::default();
        config.load.directory = Some("/srv/drop".into());

        let args = RunArgs {
            dir: Some("/tmp/other".into()),
            pattern: Some("*.csv".into()),
            no_recurse: true,
            look_ahead: Some(5),
            ..Default::default()
        };
        let options = load_options(&args, &config, &paths);

        assert_eq!(options.root, PathBuf::from("/tmp/other"));
        assert_eq!(options.pattern, "*.csv");
        assert!(!options.recursive);
        assert_eq!(options.look_ahead_rows, 5);
    }

    #[test]
    fn test_root_defaults_to_incoming_folder() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let options = load_options(&RunArgs::default(), &Config::default(), &paths);
        assert_eq!(options.root, paths.incoming_dir);
        assert!(options.recursive);
    }

    #[test]
    fn test_destination_resolution() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let config = Config::default();

        // Not initialized and nothing configured: trace only.
        assert_eq!(destination(&RunArgs::default(), &config, &paths), None);

        Config::create_default_file(&paths.config_file).unwrap();
        assert_eq!(
            destination(&RunArgs::default(), &config, &paths),
            Some(paths.database_file.clone())
        );

        let trace = RunArgs {
            trace: true,
            ..Default::default()
        };
        assert_eq!(destination(&trace, &config, &paths), None);

        let explicit = RunArgs {
            database: Some("/tmp/x.db".into()),
            ..Default::default()
        };
        assert_eq!(
            destination(&explicit, &config, &paths),
            Some(PathBuf::from("/tmp/x.db"))
        );
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(format_label(Path::new("a.CSV")), "csv");
        assert_eq!(format_label(Path::new("b.xlsx")), "workbook");
        assert_eq!(format_label(Path::new("c.json")), "not supported yet");
        assert_eq!(format_label(Path::new("d")), "not tabular");
    }

    #[test]
    fn test_trace_wins_over_database_env() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);

        std::env::set_var("SHEETLOAD_DATABASE", "/tmp/env.db");
        let parsed = RunCli::try_parse_from(["sheetload", "--trace"]);
        std::env::remove_var("SHEETLOAD_DATABASE");

        let args = parsed.unwrap().run;
        assert!(args.trace);
        assert_eq!(args.database.as_deref(), Some("/tmp/env.db"));
        assert_eq!(destination(&args, &Config::default(), &paths), None);
    }

    #[test]
    fn test_empty_folder_still_reports_summary() {
        let dir = TempDir::new().unwrap();
        let options = LoadOptions::new(dir.path());

        let summary = execute(options, None, 100, false).unwrap().unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.scan_failures, 0);
    }

    #[test]
    fn test_missing_folder_still_reports_summary() {
        let dir = TempDir::new().unwrap();
        let options = LoadOptions::new(dir.path().join("missing"));

        let summary = execute(options, None, 100, false).unwrap().unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.scan_failures, 1);
    }

    #[test]
    fn test_load_writes_to_database() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "1,2\n").unwrap();
        let db = dir.path().join("out.db");

        let summary = execute(LoadOptions::new(dir.path()), Some(db.clone()), 100, false)
            .unwrap()
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert!(db.exists());
    }

    #[test]
    fn test_dry_run_loads_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "1\n").unwrap();
        let db = dir.path().join("out.db");

        let outcome = execute(LoadOptions::new(dir.path()), Some(db.clone()), 100, true).unwrap();
        assert!(outcome.is_none());
        assert!(!db.exists());
    }
}
