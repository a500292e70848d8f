//! Sheetload DB - SQLite destination for loaded cells.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
