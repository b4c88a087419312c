//! Extraction side: anything that can hand over a batch of [`RawRecord`]s.
//!
//! Sources must keep input row order; the partitioner numbers rows by
//! position. A locator that resolves to nothing is reported as
//! [`StoreError::SourceNotFound`] so callers can tell it apart from a read
//! failure halfway through the file.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Instant;

use serde_json::{Number, Value};
use tracing::info;
use validate::RawRecord;

use crate::StoreError;

/// Supplies the raw rows for one pipeline run.
pub trait RecordSource: Send + Sync {
    fn extract(&self, locator: &str) -> Result<Vec<RawRecord>, StoreError>;
}

/// Reads a headered, delimited text file.
///
/// Each cell is typed on the way in: empty cells become `null`, cells that
/// parse as integers or finite floats become JSON numbers, everything else
/// stays a string. Short rows are tolerated; their trailing fields are
/// simply absent and the validator reports them as missing.
#[derive(Debug, Clone)]
pub struct CsvSource {
    delimiter: u8,
}

impl CsvSource {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn open(&self, locator: &str) -> Result<File, StoreError> {
        File::open(Path::new(locator)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::SourceNotFound {
                locator: locator.to_string(),
            },
            _ => StoreError::io(locator, e),
        })
    }
}

impl Default for CsvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSource for CsvSource {
    fn extract(&self, locator: &str) -> Result<Vec<RawRecord>, StoreError> {
        let start = Instant::now();
        let file = self.open(locator)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(file);
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let record: RawRecord = headers
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.to_string(), infer_cell(cell)))
                .collect();
            records.push(record);
        }

        info!(
            locator,
            rows = records.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "extract_complete"
        );
        Ok(records)
    }
}

/// Types a single CSV cell.
pub fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(num) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(num);
    }
    Value::String(cell.to_string())
}

/// Serves fixed batches keyed by locator. Unknown locators are "not found".
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    batches: HashMap<String, Vec<RawRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(mut self, locator: impl Into<String>, records: Vec<RawRecord>) -> Self {
        self.batches.insert(locator.into(), records);
        self
    }
}

impl RecordSource for MemorySource {
    fn extract(&self, locator: &str) -> Result<Vec<RawRecord>, StoreError> {
        self.batches
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::SourceNotFound {
                locator: locator.to_string(),
            })
    }
}
