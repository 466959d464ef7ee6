//! Row-stochastic transition tables
//!
//! A table is a square matrix over the station set: `P(i -> j)` is the
//! probability that the next incident happens at station `j` given the
//! current one happened at station `i`.
//!
//! Stored format (CSV, one header row and one label column):
//!
//! ```text
//! ,Pantitlán,Hidalgo,Tacubaya
//! Pantitlán,0.2,0.5,0.3
//! Hidalgo,0.1,0.6,0.3
//! Tacubaya,0.4,0.4,0.2
//! ```
//!
//! Column order may differ from row order; columns are re-aligned to the
//! row order on load so that `row(i)[j]` always refers to `stations()[j]`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use metrosim_core::{MetroError, Result, Station};
use tracing::debug;

/// Maximum allowed deviation of a row sum from 1.0
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Immutable row-stochastic matrix indexed by station on both axes
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    stations: Vec<Station>,
    index: HashMap<Station, usize>,
    rows: Vec<Vec<f64>>,
}

impl TransitionTable {
    /// Build a table from labelled rows, validating every invariant
    ///
    /// # Arguments
    /// * `source_name` - Name used in error messages (usually the file path)
    /// * `columns` - Destination labels, in the order of each row's cells
    /// * `rows` - `(origin label, cells)` pairs
    pub fn from_rows(
        source_name: &str,
        columns: Vec<String>,
        rows: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(MetroError::malformed(source_name, "table has no rows"));
        }

        let column_set = unique_labels(source_name, "column", &columns)?;
        let row_labels: Vec<String> = rows.iter().map(|(label, _)| label.clone()).collect();
        let row_set = unique_labels(source_name, "row", &row_labels)?;

        if row_set != column_set {
            let mut missing_cols: Vec<&str> = row_set.difference(&column_set).copied().collect();
            let mut missing_rows: Vec<&str> = column_set.difference(&row_set).copied().collect();
            missing_cols.sort_unstable();
            missing_rows.sort_unstable();
            return Err(MetroError::malformed(
                source_name,
                format!(
                    "row and column labels differ (rows only: {:?}, columns only: {:?})",
                    missing_cols, missing_rows
                ),
            ));
        }

        // Position of each row label among the columns
        let column_pos: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(pos, label)| (label.as_str(), pos))
            .collect();
        let order: Vec<usize> = row_labels.iter().map(|label| column_pos[label.as_str()]).collect();

        let mut aligned = Vec::with_capacity(rows.len());
        for (label, cells) in &rows {
            if cells.len() != columns.len() {
                return Err(MetroError::malformed(
                    source_name,
                    format!("row '{}' has {} cells, expected {}", label, cells.len(), columns.len()),
                ));
            }

            for (&p, column) in cells.iter().zip(&columns) {
                if !p.is_finite() || p < 0.0 || p > 1.0 + ROW_SUM_TOLERANCE {
                    return Err(MetroError::malformed(
                        source_name,
                        format!("P({} -> {}) = {} is not a probability", label, column, p),
                    ));
                }
            }

            let sum: f64 = cells.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(MetroError::malformed(
                    source_name,
                    format!("row '{}' sums to {}, expected 1.0", label, sum),
                ));
            }

            aligned.push(order.iter().map(|&pos| cells[pos]).collect::<Vec<f64>>());
        }

        let stations: Vec<Station> = row_labels.into_iter().map(Station::new).collect();
        let index = stations
            .iter()
            .enumerate()
            .map(|(idx, station)| (station.clone(), idx))
            .collect();

        Ok(TransitionTable {
            stations,
            index,
            rows: aligned,
        })
    }

    /// Parse the CSV matrix representation
    pub fn parse_csv(source_name: &str, text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| MetroError::malformed(source_name, "empty file"))?;
        // First header cell is the corner label
        let columns: Vec<String> = split_fields(header).skip(1).collect();

        let mut rows = Vec::new();
        for (line_no, line) in lines {
            let mut fields = split_fields(line);
            let label = fields.next().unwrap_or_default();
            let cells = fields
                .map(|field| {
                    field.parse::<f64>().map_err(|_| {
                        MetroError::malformed(
                            source_name,
                            format!("line {}: '{}' is not a number", line_no + 1, field),
                        )
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push((label, cells));
        }

        Self::from_rows(source_name, columns, rows)
    }

    /// Read and parse a matrix file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MetroError::io(path, e))?;
        let table = Self::parse_csv(&path.display().to_string(), &text)?;
        debug!(path = %path.display(), stations = table.len(), "Loaded transition table");
        Ok(table)
    }

    /// State space, in row order
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn contains(&self, station: &str) -> bool {
        self.index.contains_key(station)
    }

    /// Row index of a station
    pub fn index_of(&self, station: &str) -> Result<usize> {
        self.index
            .get(station)
            .copied()
            .ok_or_else(|| MetroError::unknown_station(station, "not in transition table"))
    }

    /// Outgoing probabilities of `station`, aligned with `stations()`
    pub fn row(&self, station: &str) -> Result<&[f64]> {
        Ok(&self.rows[self.index_of(station)?])
    }

    /// Outgoing distribution of `station` as (destination, probability) pairs
    pub fn distribution(&self, station: &str) -> Result<Vec<(&Station, f64)>> {
        let row = self.row(station)?;
        Ok(self.stations.iter().zip(row.iter().copied()).collect())
    }

    /// `P(from -> to)`
    pub fn probability(&self, from: &str, to: &str) -> Result<f64> {
        let row = self.row(from)?;
        Ok(row[self.index_of(to)?])
    }

    pub(crate) fn row_at(&self, idx: usize) -> &[f64] {
        &self.rows[idx]
    }

    pub(crate) fn station_at(&self, idx: usize) -> &Station {
        &self.stations[idx]
    }
}

/// Collect labels into a set, rejecting blanks and duplicates
fn unique_labels<'a>(source_name: &str, axis: &str, labels: &'a [String]) -> Result<HashSet<&'a str>> {
    let mut set = HashSet::with_capacity(labels.len());
    for label in labels {
        if label.is_empty() {
            return Err(MetroError::malformed(source_name, format!("blank {} label", axis)));
        }
        if !set.insert(label.as_str()) {
            return Err(MetroError::malformed(
                source_name,
                format!("duplicate {} label '{}'", axis, label),
            ));
        }
    }
    Ok(set)
}

/// Split a CSV line into trimmed fields
///
/// Commas inside double quotes stay in the field and `""` unescapes to `"`.
fn split_fields(line: &str) -> std::vec::IntoIter<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());

    fields.into_iter()
}
