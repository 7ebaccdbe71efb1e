//! Tabular boundary: CSV records in, fixed-width country columns out.
//!
//! Internally every stage works on variable-length country lists. Padding to
//! `Country_1..Country_N` happens here, where the files are read and written.

use crate::error::{CoreError, Result};
use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub const COUNTRY_COLUMN_PREFIX: &str = "Country_";

/// Input rows with named fields. Row identity is its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn read_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CoreError::MissingColumn(name.to_string()))
    }

    /// Field value for `row`, or `None` when the cell is empty.
    pub fn field(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Write the records followed by their fixed-width country columns.
    pub fn write_augmented<W: Write>(&self, countries: &CountryTable, writer: W) -> Result<()> {
        if countries.rows.len() != self.rows.len() {
            return Err(CoreError::MatrixShape(format!(
                "{} records but {} country rows",
                self.rows.len(),
                countries.rows.len()
            )));
        }

        let mut writer = Writer::from_writer(writer);
        let header: Vec<String> = self
            .headers
            .iter()
            .cloned()
            .chain(countries.column_names())
            .collect();
        writer.write_record(&header)?;

        for (record, cells) in self.rows.iter().zip(&countries.rows) {
            let row = record
                .iter()
                .map(String::as_str)
                .chain(cells.iter().map(|c| c.as_deref().unwrap_or("")));
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_augmented_path(&self, countries: &CountryTable, path: &Path) -> Result<()> {
        self.write_augmented(countries, File::create(path)?)
    }
}

/// Per-record country cells padded to a shared width. `None` is the absent
/// marker, distinct from an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryTable {
    pub width: usize,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CountryTable {
    /// Pad variable-length lists to the longest one.
    pub fn from_lists(lists: Vec<Vec<String>>) -> Self {
        let width = lists.iter().map(Vec::len).max().unwrap_or(0);
        let rows = lists
            .into_iter()
            .map(|list| {
                let mut row: Vec<Option<String>> = list.into_iter().map(Some).collect();
                row.resize(width, None);
                row
            })
            .collect();
        Self { width, rows }
    }

    pub fn column_names(&self) -> Vec<String> {
        (1..=self.width)
            .map(|i| format!("{}{}", COUNTRY_COLUMN_PREFIX, i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Present values of one row, in column order.
    pub fn present(&self, row: usize) -> impl Iterator<Item = &str> {
        self.rows
            .get(row)
            .into_iter()
            .flatten()
            .filter_map(|c| c.as_deref())
    }

    /// Number of present cells across the whole table.
    pub fn present_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Drop rows with no present value. Width is unchanged.
    pub fn without_empty_rows(&self) -> Self {
        Self {
            width: self.width,
            rows: self
                .rows
                .iter()
                .filter(|row| row.iter().any(Option::is_some))
                .cloned()
                .collect(),
        }
    }

    /// Read every `Country_*` column; empty cells become absent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns: Vec<usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with(COUNTRY_COLUMN_PREFIX))
            .map(|(i, _)| i)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = columns
                .iter()
                .map(|&i| {
                    record
                        .get(i)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                })
                .collect();
            rows.push(row);
        }

        Ok(Self {
            width: columns.len(),
            rows,
        })
    }

    pub fn read_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);
        // A zero-width table has no columns to carry rows in.
        if self.width == 0 {
            writer.flush()?;
            return Ok(());
        }
        writer.write_record(self.column_names())?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_path(&self, path: &Path) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}
