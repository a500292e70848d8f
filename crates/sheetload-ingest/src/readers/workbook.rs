//! Spreadsheet workbook reader.

use super::{TabularReader, NULL_CELL};
use crate::error::IngestResult;
use calamine::{Data, DataType, Range, Reader, Xlsx};
use sheetload_core::CellValue;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use tracing::debug;

/// Reads an `.xlsx` workbook sheet by sheet.
///
/// Rows and columns use absolute sheet coordinates: the first row is sheet
/// row 0 even when the used range starts lower, and every row reaches the
/// last used column. Cells outside the used range are `Null`.
pub struct WorkbookReader<RS: Read + Seek = BufReader<File>> {
    workbook: Xlsx<RS>,
    sheet_names: Vec<String>,
    next_index: usize,
    current: Option<SheetCursor>,
}

struct SheetCursor {
    name: String,
    range: Range<Data>,
    height: u32,
    width: u32,
    next_row: u32,
    row: Vec<CellValue>,
}

impl<RS: Read + Seek> WorkbookReader<RS> {
    pub fn new(reader: RS) -> IngestResult<Self> {
        let workbook: Xlsx<RS> = Xlsx::new(reader)?;
        let sheet_names = workbook.sheet_names();

        Ok(Self {
            workbook,
            sheet_names,
            next_index: 0,
            current: None,
        })
    }
}

impl<RS: Read + Seek> TabularReader for WorkbookReader<RS> {
    fn sheet_count(&self) -> usize {
        self.sheet_names.len()
    }

    fn next_sheet(&mut self) -> IngestResult<bool> {
        self.current = None;

        let Some(name) = self.sheet_names.get(self.next_index).cloned() else {
            return Ok(false);
        };
        self.next_index += 1;

        let range = self.workbook.worksheet_range(&name)?;
        let (height, width) = range
            .end()
            .map(|(row, col)| (row + 1, col + 1))
            .unwrap_or((0, 0));
        debug!("Sheet '{}' spans {} rows x {} columns", name, height, width);

        self.current = Some(SheetCursor {
            name,
            range,
            height,
            width,
            next_row: 0,
            row: Vec::new(),
        });
        Ok(true)
    }

    fn sheet_name(&self) -> &str {
        self.current.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    fn read_row(&mut self) -> IngestResult<bool> {
        let Some(cursor) = self.current.as_mut() else {
            return Ok(false);
        };

        if cursor.next_row >= cursor.height {
            cursor.row.clear();
            return Ok(false);
        }

        let row = cursor.next_row;
        cursor.next_row += 1;

        cursor.row.clear();
        for col in 0..cursor.width {
            let value = cursor
                .range
                .get_value((row, col))
                .map(convert_cell)
                .unwrap_or(CellValue::Null);
            cursor.row.push(value);
        }
        Ok(true)
    }

    fn field_count(&self) -> usize {
        self.current.as_ref().map(|c| c.row.len()).unwrap_or(0)
    }

    fn cell(&self, col: usize) -> &CellValue {
        self.current
            .as_ref()
            .and_then(|c| c.row.get(col))
            .unwrap_or(&NULL_CELL)
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(cell.to_string())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
