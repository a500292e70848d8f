//! Breadth-first discovery of candidate files.

use crate::error::{IngestError, IngestResult};
use glob::{MatchOptions, Pattern};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A directory that could not be (fully) listed.
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub directory: PathBuf,
    pub message: String,
}

/// Result of a scan. Always partial-friendly: failures never discard found files.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScan {
    /// Matching files, grouped by the directory they were found in.
    pub files: Vec<PathBuf>,
    pub failures: Vec<ScanFailure>,
}

/// Lists files matching a name pattern under a root folder.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    pattern: Option<Pattern>,
    recursive: bool,
}

impl DirectoryScanner {
    /// Create a scanner. `"*.*"` and `"*"` match every file, with or without an extension.
    pub fn new(pattern: &str, recursive: bool) -> IngestResult<Self> {
        let pattern = pattern.trim();
        let pattern = match pattern {
            "" | "*" | "*.*" => None,
            p => Some(Pattern::new(p).map_err(|e| IngestError::InvalidPattern {
                pattern: p.to_string(),
                message: e.to_string(),
            })?),
        };

        Ok(Self { pattern, recursive })
    }

    /// Scan `root`, visiting directories in breadth-first order.
    pub fn scan(&self, root: &Path) -> DirectoryScan {
        let scan = self.drain(VecDeque::from([root.to_path_buf()]));
        debug!(
            "Scanned {}: {} files, {} failures",
            root.display(),
            scan.files.len(),
            scan.failures.len()
        );
        scan
    }

    /// List every queued folder in turn, queueing subdirectories behind them.
    fn drain(&self, mut folders: VecDeque<PathBuf>) -> DirectoryScan {
        let mut scan = DirectoryScan::default();
        while let Some(folder) = folders.pop_front() {
            let subdirectories = self.list_directory(&folder, &mut scan);
            if self.recursive {
                folders.extend(subdirectories);
            }
        }
        scan
    }

    /// Collect matching files of one directory into `scan`, returning its subdirectories.
    fn list_directory(&self, folder: &Path, scan: &mut DirectoryScan) -> Vec<PathBuf> {
        let mut subdirectories = Vec::new();

        let entries = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot list directory {}: {}", folder.display(), e);
                    scan.failures.push(ScanFailure {
                        directory: folder.to_path_buf(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                subdirectories.push(entry.into_path());
            } else if file_type.is_file() {
                if self.matches(entry.path()) {
                    scan.files.push(entry.into_path());
                }
            } else if file_type.is_symlink() {
                // Linked files are candidates; linked folders are not descended.
                let path = entry.path();
                if path.is_file() {
                    if self.matches(path) {
                        scan.files.push(entry.into_path());
                    }
                } else if path.is_dir() {
                    debug!("Not following directory link {}", path.display());
                } else {
                    warn!("Dangling link {}", path.display());
                }
            }
        }

        subdirectories
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };

        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| pattern.matches_with(name, MATCH_OPTIONS))
            .unwrap_or(false)
    }
}
