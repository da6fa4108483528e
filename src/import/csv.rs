//! CSV import
//!
//! Reads a whole CSV file into a [`RawTable`]. Each column is typed the way a
//! dataframe reader does it: if every non-null cell parses as an integer the
//! column is integral, else if every cell parses as a number it is
//! fractional, else if every cell is a boolean literal it is boolean,
//! otherwise every cell keeps its original text.

use std::io::Read;
use std::path::Path;

use super::ImportError;
use crate::models::{RawTable, Value};

/// Cell contents treated as missing values
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

/// CSV importer
///
/// # Example
///
/// ```rust
/// use tabular_ingest::import::csv::CsvImporter;
/// use tabular_ingest::models::Value;
///
/// let importer = CsvImporter::new();
/// let table = importer
///     .import_reader("id,name\n1,Ada\n2,\n".as_bytes(), "inline")
///     .unwrap();
/// assert_eq!(table.row_count(), 2);
/// assert_eq!(table.rows[1], vec![Value::Integer(2), Value::Null]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvImporter {
    delimiter: u8,
    null_markers: Vec<String>,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CsvImporter {
    /// Create a comma-delimited importer with the default null markers
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Replace the set of cell values treated as null
    pub fn with_null_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Read a CSV file from disk
    pub fn import_path(&self, path: &Path) -> Result<RawTable, ImportError> {
        let file = std::fs::File::open(path)
            .map_err(|e| ImportError::IoError(format!("{}: {}", path.display(), e)))?;
        self.import_reader(file, &path.display().to_string())
    }

    /// Read CSV data from any reader; `source` names the input in errors
    pub fn import_reader<R: Read>(&self, reader: R, source: &str) -> Result<RawTable, ImportError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| ImportError::ParseError(format!("{}: {}", source, e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ImportError::EmptyHeader(source.to_string()));
        }

        // Index columns written by dataframe tools have a blank header
        let headers: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(idx, h)| {
                if h.trim().is_empty() {
                    unnamed_header(idx)
                } else {
                    h
                }
            })
            .collect();

        // Column-major so each column can be typed as a whole
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for result in rdr.records() {
            let record =
                result.map_err(|e| ImportError::ParseError(format!("{}: {}", source, e)))?;
            for (idx, column) in cells.iter_mut().enumerate() {
                let raw = record.get(idx).unwrap_or("");
                column.push(if self.is_null(raw) {
                    None
                } else {
                    Some(raw.to_string())
                });
            }
        }

        let row_count = cells.first().map(Vec::len).unwrap_or(0);
        let typed: Vec<Vec<Value>> = cells.into_iter().map(type_column).collect();

        let mut rows = vec![Vec::with_capacity(headers.len()); row_count];
        for column in typed {
            for (row, value) in rows.iter_mut().zip(column) {
                row.push(value);
            }
        }

        Ok(RawTable::new(headers, rows))
    }

    fn is_null(&self, raw: &str) -> bool {
        raw.trim().is_empty() || self.null_markers.iter().any(|m| m == raw)
    }
}

/// Name given to a column whose header cell is blank
pub fn unnamed_header(idx: usize) -> String {
    format!("unnamed_{}", idx)
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Type a whole column: integer, then float, then boolean, else text
fn type_column(cells: Vec<Option<String>>) -> Vec<Value> {
    let present = || cells.iter().flatten().map(|s| s.trim());

    if present().all(|s| s.parse::<i64>().is_ok()) {
        return cells
            .iter()
            .map(|c| {
                c.as_deref()
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .into()
            })
            .collect();
    }

    if present().all(|s| s.parse::<f64>().is_ok()) {
        return cells
            .iter()
            .map(|c| {
                c.as_deref()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .into()
            })
            .collect();
    }

    if present().all(|s| parse_bool(s).is_some()) {
        return cells
            .iter()
            .map(|c| c.as_deref().and_then(|s| parse_bool(s.trim())).into())
            .collect();
    }

    cells.into_iter().map(Value::from).collect()
}
