//! CLI command implementations.

pub mod config;
pub mod init;
pub mod run;
pub mod sheets;
pub mod stats;

use anyhow::{Context, Result};
use sheetload_config::AppPaths;
use sheetload_db::Database;
use std::path::PathBuf;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Get a database connection, ensuring sheetload is initialized.
pub fn get_database() -> Result<Database> {
    let paths = get_paths()?;

    if !paths.is_initialized() {
        anyhow::bail!("Sheetload is not initialized. Run 'sheetload init' first.");
    }

    let config = sheetload_config::Config::load_from(&paths.config_file)
        .context("Failed to load config")?;
    let path = match config.destination.database {
        Some(ref db) => expand_path(db),
        None => paths.database_file,
    };

    Database::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
