//! Connectivity matrix between Latin-American anchors and every country
//! they co-occur with.

use crate::error::{CoreError, Result};
use crate::table::CountryTable;
use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Default matrix rows, in output order.
pub const LATAM_COUNTRIES: [&str; 29] = [
    "Belize",
    "Costa Rica",
    "El Salvador",
    "Guatemala",
    "Honduras",
    "Mexico",
    "Nicaragua",
    "Panama",
    "Argentina",
    "Bolivia",
    "Brazil",
    "Chile",
    "Colombia",
    "Ecuador",
    "French Guiana",
    "Guyana",
    "Paraguay",
    "Peru",
    "Suriname",
    "Uruguay",
    "Venezuela",
    "Cuba",
    "Dominican Republic",
    "Haiti",
    "Guadeloupe",
    "Martinique",
    "Puerto Rico",
    "Saint-Barthélemy",
    "Saint-Martin",
];

pub fn default_latam_countries() -> Vec<String> {
    LATAM_COUNTRIES.iter().map(|c| c.to_string()).collect()
}

/// Row-major count table with fixed row and column labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityMatrix {
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<u64>,
    row_index: HashMap<String, usize>,
    column_index: HashMap<String, usize>,
}

/// One non-zero cell, for reports and storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
    pub count: u64,
}

impl ConnectivityMatrix {
    /// Zero-filled matrix. Repeated labels resolve to their first position.
    pub fn new(rows: Vec<String>, columns: Vec<String>) -> Self {
        let index = |labels: &[String]| {
            let mut map = HashMap::new();
            for (i, label) in labels.iter().enumerate() {
                map.entry(label.clone()).or_insert(i);
            }
            map
        };
        let row_index = index(&rows);
        let column_index = index(&columns);
        let cells = vec![0; rows.len() * columns.len()];
        Self {
            rows,
            columns,
            cells,
            row_index,
            column_index,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn offset(&self, row: &str, column: &str) -> Option<usize> {
        let r = *self.row_index.get(row)?;
        let c = *self.column_index.get(column)?;
        Some(r * self.columns.len() + c)
    }

    pub fn get(&self, row: &str, column: &str) -> Option<u64> {
        self.offset(row, column).map(|i| self.cells[i])
    }

    /// Add one to `(row, column)`. Returns false when either label is unknown.
    pub fn increment(&mut self, row: &str, column: &str) -> bool {
        self.add(row, column, 1)
    }

    fn add(&mut self, row: &str, column: &str, amount: u64) -> bool {
        match self.offset(row, column) {
            Some(i) => {
                self.cells[i] += amount;
                true
            }
            None => false,
        }
    }

    pub fn row_total(&self, row: &str) -> u64 {
        match self.row_index.get(row) {
            Some(&r) => {
                let width = self.columns.len();
                self.cells[r * width..(r + 1) * width].iter().sum()
            }
            None => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }

    /// Non-zero cells in row order, then column order.
    pub fn nonzero_cells(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        let width = self.columns.len();
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(move |(i, count)| {
                (
                    self.rows[i / width].as_str(),
                    self.columns[i % width].as_str(),
                    *count,
                )
            })
    }

    /// Strongest off-diagonal connections, highest count first.
    pub fn top_connections(&self, limit: usize) -> Vec<Connection> {
        let mut cells: Vec<(&str, &str, u64)> = self
            .nonzero_cells()
            .filter(|(r, c, _)| r.to_lowercase() != c.to_lowercase())
            .collect();
        cells.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(b.0)).then(a.1.cmp(b.1)));
        cells
            .into_iter()
            .take(limit)
            .map(|(source, target, count)| Connection {
                source: source.to_string(),
                target: target.to_string(),
                count,
            })
            .collect()
    }

    /// Elementwise addition of a matrix with identical labels.
    pub fn merge(&mut self, other: &ConnectivityMatrix) -> Result<()> {
        if self.rows != other.rows || self.columns != other.columns {
            return Err(CoreError::MatrixShape(format!(
                "cannot merge {}x{} with {}x{} (labels differ)",
                self.rows.len(),
                self.columns.len(),
                other.rows.len(),
                other.columns.len()
            )));
        }
        for (cell, extra) in self.cells.iter_mut().zip(&other.cells) {
            *cell += extra;
        }
        Ok(())
    }

    /// Header row is an empty corner cell followed by column labels; each
    /// following row is its label and counts.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);
        let header: Vec<&str> = std::iter::once("")
            .chain(self.columns.iter().map(String::as_str))
            .collect();
        writer.write_record(&header)?;

        let width = self.columns.len();
        for (r, label) in self.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(width + 1);
            record.push(label.clone());
            record.extend(
                self.cells[r * width..(r + 1) * width]
                    .iter()
                    .map(u64::to_string),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_path(&self, path: &Path) -> Result<()> {
        self.write_csv(File::create(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().from_reader(reader);
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        let mut counts = Vec::new();
        for record in reader.records() {
            let record = record?;
            let label = record.get(0).unwrap_or_default().to_string();
            for value in record.iter().skip(1) {
                let count = parse_count(value).ok_or_else(|| {
                    CoreError::MatrixShape(format!("invalid count '{}' in row {}", value, label))
                })?;
                counts.push(count);
            }
            rows.push(label);
        }

        let mut matrix = Self::new(rows, columns);
        if counts.len() != matrix.cells.len() {
            return Err(CoreError::MatrixShape(format!(
                "expected {} cells, found {}",
                matrix.cells.len(),
                counts.len()
            )));
        }
        matrix.cells = counts;
        Ok(matrix)
    }

    pub fn read_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub(crate) fn set_cells(&mut self, cells: Vec<(String, String, u64)>) -> Result<()> {
        for (row, column, count) in cells {
            if !self.add(&row, &column, count) {
                return Err(CoreError::MatrixShape(format!(
                    "unknown cell ({}, {})",
                    row, column
                )));
            }
        }
        Ok(())
    }
}

// Counts written by spreadsheet tools sometimes come back as floats ("3.0").
fn parse_count(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u64>() {
        return Some(count);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64 && f.fract() == 0.0)
        .map(|f| f as u64)
}

/// What one record contributed to the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordContribution {
    /// No Latin-American country present; the record is skipped.
    NoAnchor,
    /// The record's only country is an anchor: one diagonal increment.
    SelfConnection,
    /// Anchor × country increments for a multi-country record.
    Connections(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStats {
    pub records_without_anchor: usize,
    pub self_connections: usize,
    pub multi_country_records: usize,
    pub increments: u64,
}

impl AggregationStats {
    fn record(&mut self, contribution: RecordContribution) {
        match contribution {
            RecordContribution::NoAnchor => self.records_without_anchor += 1,
            RecordContribution::SelfConnection => {
                self.self_connections += 1;
                self.increments += 1;
            }
            RecordContribution::Connections(n) => {
                self.multi_country_records += 1;
                self.increments += n;
            }
        }
    }

    pub fn merge(&mut self, other: &AggregationStats) {
        self.records_without_anchor += other.records_without_anchor;
        self.self_connections += other.self_connections;
        self.multi_country_records += other.multi_country_records;
        self.increments += other.increments;
    }
}

/// Builds a [`ConnectivityMatrix`] from deduplicated country rows.
#[derive(Debug, Clone)]
pub struct ConnectivityAggregator {
    anchors: Vec<String>,
    anchor_set: HashSet<String>,
}

impl Default for ConnectivityAggregator {
    fn default() -> Self {
        Self::new(default_latam_countries())
    }
}

impl ConnectivityAggregator {
    pub fn new(anchors: Vec<String>) -> Self {
        let anchor_set = anchors.iter().cloned().collect();
        Self {
            anchors,
            anchor_set,
        }
    }

    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    /// Sorted set of every present value across all rows.
    pub fn column_universe(&self, table: &CountryTable) -> Vec<String> {
        table
            .rows
            .iter()
            .flatten()
            .flatten()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn aggregate(&self, table: &CountryTable) -> ConnectivityMatrix {
        self.aggregate_with_stats(table).0
    }

    pub fn aggregate_with_stats(
        &self,
        table: &CountryTable,
    ) -> (ConnectivityMatrix, AggregationStats) {
        let columns = self.column_universe(table);
        info!(
            "Aggregating {} records into {}x{} matrix",
            table.rows.len(),
            self.anchors.len(),
            columns.len()
        );
        self.partial(columns, &table.rows)
    }

    /// Aggregate a slice of rows against a fixed column universe. Partials
    /// over disjoint slices merge into the same result as one pass.
    pub fn partial(
        &self,
        columns: Vec<String>,
        rows: &[Vec<Option<String>>],
    ) -> (ConnectivityMatrix, AggregationStats) {
        let mut matrix = ConnectivityMatrix::new(self.anchors.clone(), columns);
        let mut stats = AggregationStats::default();
        for row in rows {
            let countries: HashSet<&str> = row
                .iter()
                .flatten()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .collect();
            stats.record(self.apply_record(&mut matrix, &countries));
        }
        (matrix, stats)
    }

    /// Aggregate in chunks of `chunk_size` rows and reduce the partial
    /// matrices by elementwise addition.
    pub fn aggregate_chunked(
        &self,
        table: &CountryTable,
        chunk_size: usize,
    ) -> Result<(ConnectivityMatrix, AggregationStats)> {
        let columns = self.column_universe(table);
        let mut total = ConnectivityMatrix::new(self.anchors.clone(), columns.clone());
        let mut stats = AggregationStats::default();
        for chunk in table.rows.chunks(chunk_size.max(1)) {
            let (partial, partial_stats) = self.partial(columns.clone(), chunk);
            total.merge(&partial)?;
            stats.merge(&partial_stats);
        }
        Ok((total, stats))
    }

    /// Apply one record's distinct countries to `matrix`.
    pub fn apply_record(
        &self,
        matrix: &mut ConnectivityMatrix,
        countries: &HashSet<&str>,
    ) -> RecordContribution {
        let anchors: Vec<&str> = countries
            .iter()
            .copied()
            .filter(|c| self.anchor_set.contains(*c))
            .collect();

        if anchors.is_empty() {
            return RecordContribution::NoAnchor;
        }

        if countries.len() == 1 {
            for anchor in &anchors {
                matrix.increment(anchor, anchor);
            }
            debug!("Self-connection for {}", anchors[0]);
            return RecordContribution::SelfConnection;
        }

        let mut increments = 0;
        for anchor in &anchors {
            for country in countries {
                if matrix.increment(anchor, country) {
                    increments += 1;
                }
            }
        }
        RecordContribution::Connections(increments)
    }
}
