//! Sheetload Core - Core types shared by the sheetload ingestion pipeline.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
