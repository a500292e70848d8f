//! Delimited text reader.

use super::{TabularReader, NULL_CELL};
use crate::error::IngestResult;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ByteRecord;
use sheetload_core::{implicit_sheet_name, CellValue};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Reads a CSV file as a single sheet named after the file stem.
pub struct CsvReader<R: Read = File> {
    records: csv::Reader<R>,
    sheet_name: String,
    look_ahead: VecDeque<ByteRecord>,
    /// Column count settled by the look-ahead rows.
    baseline_fields: usize,
    entered: bool,
    record: ByteRecord,
    row: Vec<CellValue>,
}

impl<R: Read> CsvReader<R> {
    /// Wrap `reader`, pre-reading up to `look_ahead_rows` records (at least one)
    /// to settle the column count. Emitted data is unaffected by the look-ahead.
    pub fn new(reader: R, path: &Path, look_ahead_rows: usize) -> IngestResult<Self> {
        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut look_ahead = VecDeque::new();
        for _ in 0..look_ahead_rows.max(1) {
            let mut record = ByteRecord::new();
            if !records.read_byte_record(&mut record)? {
                break;
            }
            look_ahead.push_back(record);
        }

        let baseline_fields = look_ahead.iter().map(|r| r.len()).max().unwrap_or(0);

        Ok(Self {
            records,
            sheet_name: implicit_sheet_name(path),
            look_ahead,
            baseline_fields,
            entered: false,
            record: ByteRecord::new(),
            row: Vec::new(),
        })
    }
}

impl<R: Read> TabularReader for CsvReader<R> {
    fn sheet_count(&self) -> usize {
        1
    }

    fn next_sheet(&mut self) -> IngestResult<bool> {
        if self.entered {
            self.row.clear();
            return Ok(false);
        }
        self.entered = true;
        Ok(true)
    }

    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    fn read_row(&mut self) -> IngestResult<bool> {
        if !self.entered {
            return Ok(false);
        }

        match self.look_ahead.pop_front() {
            Some(record) => self.record = record,
            None => {
                if !self.records.read_byte_record(&mut self.record)? {
                    self.row.clear();
                    return Ok(false);
                }
            }
        }

        let width = self.baseline_fields.max(self.record.len());
        self.row.clear();
        self.row
            .extend(self.record.iter().map(|field| infer_cell(&decode_field(field))));
        self.row.resize(width, CellValue::Null);
        Ok(true)
    }

    fn field_count(&self) -> usize {
        self.row.len()
    }

    fn cell(&self, col: usize) -> &CellValue {
        self.row.get(col).unwrap_or(&NULL_CELL)
    }
}

/// Decode a field as UTF-8, falling back to Latin-1 for legacy exports.
fn decode_field(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Infer a typed value from a raw CSV field. Empty fields are `Null`.
fn infer_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        // "inf" and "NaN" parse as floats but are text in a sheet.
        if n.is_finite() {
            return CellValue::Number(n);
        }
    }

    if let Some(date) = parse_date(trimmed) {
        return CellValue::Date(date);
    }

    CellValue::Text(raw.to_string())
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetload_core::CellType;

    fn reader(data: &'static str, look_ahead: usize) -> CsvReader<&'static [u8]> {
        CsvReader::new(data.as_bytes(), Path::new("/drop/orders.csv"), look_ahead).unwrap()
    }

    fn drain(reader: &mut CsvReader<&'static [u8]>) -> Vec<Vec<CellValue>> {
        let mut rows = Vec::new();
        while reader.read_row().unwrap() {
            rows.push((0..reader.field_count()).map(|c| reader.cell(c).clone()).collect());
        }
        rows
    }

    #[test]
    fn test_single_implicit_sheet() {
        let mut r = reader("a,b\n1,2\n", 1);
        assert_eq!(r.sheet_count(), 1);
        assert!(r.next_sheet().unwrap());
        assert_eq!(r.sheet_name(), "orders");
        assert_eq!(drain(&mut r).len(), 2);
        assert!(!r.next_sheet().unwrap());
    }

    #[test]
    fn test_no_rows_before_entering_sheet() {
        let mut r = reader("a,b\n", 1);
        assert!(!r.read_row().unwrap());
    }

    #[test]
    fn test_type_inference() {
        let mut r = reader("name,1.5,TRUE,,2024-03-01,inf\n", 1);
        r.next_sheet().unwrap();
        let rows = drain(&mut r);
        let types: Vec<CellType> = rows[0].iter().map(|c| c.cell_type()).collect();

        assert_eq!(
            types,
            vec![
                CellType::Text,
                CellType::Number,
                CellType::Boolean,
                CellType::Null,
                CellType::Date,
                CellType::Text,
            ]
        );
        assert_eq!(rows[0][1], CellValue::Number(1.5));
    }

    #[test]
    fn test_look_ahead_pads_short_rows() {
        // Three look-ahead rows see the widest row, so the first row is padded.
        let mut r = reader("a\nb,c\nd,e,f\n", 3);
        r.next_sheet().unwrap();
        let rows = drain(&mut r);

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 3));
        assert_eq!(rows[0][0], CellValue::Text("a".into()));
        assert!(rows[0][1].is_null() && rows[0][2].is_null());
    }

    #[test]
    fn test_long_rows_keep_their_cells() {
        let mut r = reader("a\nb,c\n", 1);
        r.next_sheet().unwrap();
        let rows = drain(&mut r);

        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_empty_file_has_empty_sheet() {
        let mut r = reader("", 1);
        assert!(r.next_sheet().unwrap());
        assert!(!r.read_row().unwrap());
        assert_eq!(r.field_count(), 0);
        assert!(r.cell(0).is_null());
    }

    #[test]
    fn test_latin1_fields_are_decoded() {
        let data: &[u8] = b"caf\xe9,1\nna\xefve,\n";
        let mut r = CsvReader::new(data, Path::new("legacy.csv"), 1).unwrap();
        r.next_sheet().unwrap();

        assert!(r.read_row().unwrap());
        assert_eq!(r.cell(0), &CellValue::Text("café".into()));
        assert_eq!(r.cell(1), &CellValue::Number(1.0));
        assert!(r.read_row().unwrap());
        assert_eq!(r.cell(0), &CellValue::Text("naïve".into()));
        assert!(r.cell(1).is_null());
        assert!(!r.read_row().unwrap());
    }

    #[test]
    fn test_quoted_fields() {
        let mut r = reader("\"x, y\",\"\"\n", 1);
        r.next_sheet().unwrap();
        let rows = drain(&mut r);
        assert_eq!(rows[0][0], CellValue::Text("x, y".into()));
        assert!(rows[0][1].is_null());
    }
}
