//! Error types for sheetload.

use thiserror::Error;

/// Core error type for sheetload domain values.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using sheetload's core Error.
pub type Result<T> = std::result::Result<T, Error>;
