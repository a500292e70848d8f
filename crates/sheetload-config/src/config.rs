//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Pattern that matches every file name.
pub const DEFAULT_PATTERN: &str = "*.*";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub load: LoadConfig,

    #[serde(default)]
    pub destination: DestinationConfig,
}

impl Config {
    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &PathBuf) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Sheetload Configuration
# Loads CSV and XLSX files dropped into a folder, once per content.

[load]
# Folder scanned for files (default: <data dir>/incoming)
# directory = "~/incoming"

# Descend into subfolders
recursive = true

# File name pattern; "*.*" matches every file
pattern = "*.*"

# Rows read ahead in CSV files to settle the column count
look_ahead_rows = 1

[destination]
# SQLite database receiving cells (default: <data dir>/sheetload.db after
# `sheetload init`). Without a database, events are only traced.
# database = "~/.local/share/sheetload/sheetload.db"

# Staged cells are written once this many accumulate
batch_size = 50000
"#
        .to_string()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.load.pattern.trim().is_empty() {
            return Err(ConfigError::Invalid("load.pattern must not be empty".into()));
        }
        if self.destination.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "destination.batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where and how files are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub directory: Option<String>,
    pub recursive: bool,
    pub pattern: String,
    pub look_ahead_rows: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            directory: None,
            recursive: true,
            pattern: DEFAULT_PATTERN.to_string(),
            look_ahead_rows: 1,
        }
    }
}

/// Relational destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub database: Option<String>,
    pub batch_size: usize,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            database: None,
            batch_size: 50_000,
        }
    }
}
