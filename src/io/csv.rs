//! Streaming CSV input.
//!
//! This module provides:
//! - **Row streaming**: [`RowReader`] yields one [`RawRow`] per physical data
//!   line, header excluded, with its 0-based row index.
//! - **Row pre-scan**: [`count_rows`] counts data rows without keeping them.
//!
//! Both go through [`open_reader`], so compressed inputs are handled
//! transparently. Quoted fields may contain delimiters, quotes and newlines;
//! a quoted multi-line field still counts as one row.

use crate::io::compression::open_reader;
use anyhow::{Context, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One data row of a delimited file.
#[derive(Clone, Debug)]
pub struct RawRow {
    /// 0-based data row index (the header is not counted).
    pub index: u64,
    headers: Arc<[String]>,
    record: StringRecord,
}

impl RawRow {
    /// Build a row from parts. Mostly useful in tests.
    pub fn new(index: u64, headers: Arc<[String]>, record: StringRecord) -> Self {
        Self {
            index,
            headers,
            record,
        }
    }

    /// Field at column position `pos`.
    #[must_use]
    pub fn field(&self, pos: usize) -> Option<&str> {
        self.record.get(pos)
    }

    /// Field of the column named `column`, if the header has it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let pos = self.headers.iter().position(|h| h == column)?;
        self.field(pos)
    }

    /// `(column, field)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.record.iter())
    }
}

/// Iterator over the data rows of a CSV file.
pub struct RowReader {
    path: PathBuf,
    headers: Arc<[String]>,
    records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
    next_index: u64,
}

impl RowReader {
    /// Open `path` and read its header.
    ///
    /// # Errors
    /// Fails if the file cannot be opened or the header cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(open_reader(&path)?);
        let headers: Arc<[String]> = rdr
            .headers()
            .with_context(|| format!("read CSV header of {}", path.display()))?
            .iter()
            .map(String::from)
            .collect();
        Ok(Self {
            path,
            headers,
            records: rdr.into_records(),
            next_index: 0,
        })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows handed out so far.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.next_index
    }
}

impl Iterator for RowReader {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index;
        let rec = self.records.next()?;
        self.next_index += 1;
        Some(
            rec.with_context(|| format!("parse CSV record #{} of {}", index + 1, self.path.display()))
                .map(|record| RawRow::new(index, Arc::clone(&self.headers), record)),
        )
    }
}

/// Count the data rows of `path` (header excluded).
///
/// # Errors
/// Fails if the file cannot be opened or read as CSV.
pub fn count_rows(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_reader(path)?);
    let mut record = csv::ByteRecord::new();
    let mut total: u64 = 0;
    while rdr
        .read_byte_record(&mut record)
        .with_context(|| format!("scan CSV record #{} of {}", total + 1, path.display()))?
    {
        total += 1;
    }
    Ok(total)
}
