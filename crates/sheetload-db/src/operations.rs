//! Database operations.

pub mod cells;
pub mod sheets;
pub mod stats;
