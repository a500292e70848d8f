//! In-memory staging of cell records between flushes.

use sheetload_core::{CellRecord, SheetId};

/// Ordered cells of the current file awaiting one bulk write.
///
/// The backing vector allocates on the first push and is emptied, never
/// partially drained, when taken for a flush.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    cells: Vec<CellRecord>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: CellRecord) {
        self.cells.push(cell);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Take every staged cell, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<CellRecord> {
        std::mem::take(&mut self.cells)
    }

    /// Drop every staged cell, returning how many were discarded.
    pub fn discard(&mut self) -> usize {
        let discarded = self.cells.len();
        self.cells = Vec::new();
        discarded
    }
}

/// Distinct sheet ids of `cells`, in first-seen order.
pub(crate) fn sheet_ids(cells: &[CellRecord]) -> Vec<SheetId> {
    let mut ids: Vec<SheetId> = Vec::new();
    for cell in cells {
        if !ids.contains(&cell.sheet_id) {
            ids.push(cell.sheet_id);
        }
    }
    ids
}
