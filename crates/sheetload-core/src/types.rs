//! Core domain types for sheetload.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Registry identifier of a loaded sheet.
pub type SheetId = i64;

/// Tabular file formats the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    /// Delimited text, exactly one implicit sheet.
    Csv,
    /// Spreadsheet workbook with zero or more sheets.
    Workbook,
}

impl TabularFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::Workbook => "workbook",
        }
    }

    /// Detect the reader strategy from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(TabularFormat::Csv),
            "xlsx" => Some(TabularFormat::Workbook),
            _ => None,
        }
    }

    /// Extensions that are recognised but deliberately not loaded yet.
    pub fn is_excluded_extension(ext: &str) -> bool {
        matches!(
            ext.to_lowercase().as_str(),
            "json" | "txt" | "xls" | "zip"
        )
    }
}

impl fmt::Display for TabularFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discovered file, described once at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Lowercased extension without the dot, empty when the file has none.
    pub extension: String,
    pub byte_length: u64,
}

impl FileRecord {
    /// Describe the file at `path` from its filesystem metadata.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        Ok(Self {
            path,
            extension,
            byte_length: metadata.len(),
        })
    }

    /// Base name used as the file component of a [`SheetIdentity`].
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn format(&self) -> Option<TabularFormat> {
        TabularFormat::from_extension(&self.extension)
    }
}

/// Lowercase hexadecimal SHA-256 digest of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Length of a rendered hash in hex characters.
    pub const HEX_LEN: usize = 64;

    /// Render a raw digest as lowercase hex.
    pub fn from_digest(bytes: impl AsRef<[u8]>) -> Self {
        Self(
            bytes
                .as_ref()
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First characters of the hash, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dedup key: "has this exact sheet content, under this file name, been loaded".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetIdentity {
    pub file_name: String,
    pub sheet_name: String,
    pub content_hash: ContentHash,
}

impl SheetIdentity {
    pub fn new(
        file_name: impl Into<String>,
        sheet_name: impl Into<String>,
        content_hash: ContentHash,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            sheet_name: sheet_name.into(),
            content_hash,
        }
    }
}

impl fmt::Display for SheetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:'{}'@{}",
            self.file_name,
            self.sheet_name,
            self.content_hash.short()
        )
    }
}

/// Inferred primitive type of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Null,
    Text,
    Number,
    Date,
    Boolean,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Null => "null",
            CellType::Text => "text",
            CellType::Number => "number",
            CellType::Date => "date",
            CellType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed cell value produced by a tabular reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Boolean(bool),
}

impl CellValue {
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Null => CellType::Null,
            CellValue::Text(_) => CellType::Text,
            CellValue::Number(_) => CellType::Number,
            CellValue::Date(_) => CellType::Date,
            CellValue::Boolean(_) => CellType::Boolean,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Render for storage. `Null` stays `None` and is never an empty string.
    pub fn render(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(render_number(*n)),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellValue::Boolean(b) => Some(b.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

fn render_number(n: f64) -> String {
    // Whole numbers print without a trailing ".0" while they fit an i64 exactly.
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

/// One staged cell, shaped for the `cells` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRecord {
    pub sheet_id: SheetId,
    pub row: i64,
    pub col: i64,
    pub value: Option<String>,
}

impl CellRecord {
    pub fn new(sheet_id: SheetId, row: usize, col: usize, value: &CellValue) -> Self {
        Self {
            sheet_id,
            row: row as i64,
            col: col as i64,
            value: value.render(),
        }
    }
}

/// Outcome a sink returns for each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep going.
    #[default]
    Continue,
    /// Skip the scope the event opened (file, sheet, row, or the rest of a row).
    Skip,
    /// Stop processing the current file immediately.
    Abort,
}

/// A row of the sheet identity registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetRecord {
    pub id: SheetId,
    pub file_name: String,
    pub sheet_name: String,
    pub content_hash: String,
    pub registered_at: DateTime<Utc>,
    pub cell_count: i64,
}

/// Summary of what the destination currently holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_sheets: i64,
    pub total_files: i64,
    pub total_cells: i64,
    pub null_cells: i64,
    pub sheets_by_file: HashMap<String, i64>,
    pub database_size_bytes: i64,
}

/// Resolve the sheet name of a delimited file: its file stem.
pub fn implicit_sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TabularFormat::from_extension("csv"), Some(TabularFormat::Csv));
        assert_eq!(TabularFormat::from_extension("XLSX"), Some(TabularFormat::Workbook));
        assert_eq!(TabularFormat::from_extension("xls"), None);
        assert!(TabularFormat::is_excluded_extension("ZIP"));
        assert!(!TabularFormat::is_excluded_extension("parquet"));
    }

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::from_digest([0x00, 0xab, 0xff]);
        assert_eq!(hash.as_str(), "00abff");
    }

    #[test]
    fn test_cell_render() {
        assert_eq!(CellValue::Null.render(), None);
        assert_eq!(CellValue::Text(String::new()).render(), Some(String::new()));
        assert_eq!(CellValue::Number(3.0).render(), Some("3".to_string()));
        assert_eq!(CellValue::Number(2.5).render(), Some("2.5".to_string()));
        assert_eq!(CellValue::Boolean(true).render(), Some("true".to_string()));

        let date = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            CellValue::Date(date).render(),
            Some("2024-01-31 08:30:00".to_string())
        );
        assert_eq!(CellValue::Null.to_string(), "null");
    }

    #[test]
    fn test_file_record_from_path() {
        let dir = std::env::temp_dir().join(format!("sheetload-core-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Report.CSV");
        std::fs::write(&path, "a,b\n").unwrap();

        let record = FileRecord::from_path(&path).unwrap();
        assert_eq!(record.extension, "csv");
        assert_eq!(record.byte_length, 4);
        assert_eq!(record.file_name(), "Report.CSV");
        assert_eq!(record.format(), Some(TabularFormat::Csv));
        assert_eq!(implicit_sheet_name(&path), "Report");

        assert!(FileRecord::from_path(&dir).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
