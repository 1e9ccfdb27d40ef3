use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    util,
};

/// How the entries of a fresh [`ValueTable`] are filled
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum TableInit {
    #[default]
    Zeros,
    /// Uniform noise in `[-scale, scale]`
    Uniform(f32),
}

/// A dense `[rows, cols]` table of action values, stored row-major
///
/// Rows are encoded states and columns are actions. Indexing out of range panics, so row indices
/// must come from a [`TabularState`](crate::env::TabularState) with a matching `NUM_STATES`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl ValueTable {
    /// ### Errors
    /// [`Error::InvalidParameter`] if either dimension is zero or the uniform scale is negative
    pub fn new<R: Rng + ?Sized>(rows: usize, cols: usize, init: TableInit, rng: &mut R) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidParameter(format!(
                "a value table needs at least one row and column, got [{rows}, {cols}]"
            )));
        }

        let values = match init {
            TableInit::Zeros => vec![0.0; rows * cols],
            TableInit::Uniform(scale) => {
                if !(scale >= 0.0) {
                    return Err(Error::InvalidParameter(format!(
                        "uniform init scale {scale} must be non-negative"
                    )));
                }
                let dist = Uniform::new_inclusive(-scale, scale);
                dist.sample_iter(rng).take(rows * cols).collect()
            }
        };

        Ok(Self { rows, cols, values })
    }

    /// A zero-filled table
    ///
    /// **Panics** if either dimension is zero
    pub fn zeros(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "a value table needs at least one row and column");
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    /// Build a table from row-major values
    ///
    /// ### Errors
    /// [`Error::ShapeMismatch`] if `values.len() != rows * cols`
    pub fn from_values(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        let table = Self { rows, cols, values };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 || self.values.len() != self.rows * self.cols {
            return Err(Error::ShapeMismatch {
                expected: format!("{} values for a [{}, {}] table", self.rows * self.cols, self.rows, self.cols),
                found: format!("{} values", self.values.len()),
            });
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All entries, row-major
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn row(&self, row: usize) -> &[f32] {
        assert!(row < self.rows, "row {row} out of range for {} rows", self.rows);
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        assert!(row < self.rows, "row {row} out of range for {} rows", self.rows);
        &mut self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.row(row)[col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.row_mut(row)[col] = value;
    }

    /// Greedy column of `row`, ties going to the lowest index
    pub fn argmax(&self, row: usize) -> usize {
        util::argmax(self.row(row)).unwrap_or(0)
    }

    /// Best value in `row`
    pub fn max(&self, row: usize) -> f32 {
        util::max(self.row(row)).unwrap_or(0.0)
    }

    /// Write one line per row with the action values separated by commas
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        for row in self.values.chunks(self.cols) {
            writer.write_record(row.iter().map(f32::to_string))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// One [`ValueTable`] per agent, keyed by agent name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTables {
    tables: BTreeMap<String, ValueTable>,
}

impl QTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agent: impl Into<String>, table: ValueTable) -> Option<ValueTable> {
        self.tables.insert(agent.into(), table)
    }

    /// ### Errors
    /// [`Error::UnknownAgent`] if no table is stored under `agent`
    pub fn get(&self, agent: &str) -> Result<&ValueTable> {
        self.tables
            .get(agent)
            .ok_or_else(|| Error::UnknownAgent(agent.to_string()))
    }

    /// ### Errors
    /// [`Error::UnknownAgent`] if no table is stored under `agent`
    pub fn get_mut(&mut self, agent: &str) -> Result<&mut ValueTable> {
        self.tables
            .get_mut(agent)
            .ok_or_else(|| Error::UnknownAgent(agent.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueTable)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Save every table to a single JSON archive: `{ agent: { rows, cols, values } }`
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Load an archive written by [`save_json`](QTables::save_json)
    ///
    /// ### Errors
    /// [`Error::ShapeMismatch`] if a stored table's values do not fill its declared shape
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let tables: Self = serde_json::from_reader(reader)?;
        for table in tables.tables.values() {
            table.validate()?;
        }
        Ok(tables)
    }
}
