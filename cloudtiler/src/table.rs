//! Tabular metric results.
//!
//! A [`MetricTable`] is the row-set a user aggregation function returns
//! for one tile, and also the shape of the merged output in tabular mode.
//! The first two columns are always the X and Y cell-center coordinates;
//! the table carries the operating resolution so merged results stay
//! interpretable as a grid.

use std::fmt;

use thiserror::Error;

use crate::geom::BBox;

/// Errors produced when assembling metric tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// The first two columns must be the X and Y coordinates
    #[error("table columns must start with 'x', 'y' (got {0:?})")]
    MissingCoordinates(Vec<String>),

    /// A row's length does not match the column count
    #[error("row has {got} values, table has {expected} columns")]
    RowWidthMismatch { got: usize, expected: usize },

    /// Concatenated tables disagree on schema
    #[error("cannot concatenate: column sets differ ({left:?} vs {right:?})")]
    SchemaMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    /// Concatenated tables disagree on resolution
    #[error("cannot concatenate: resolutions differ ({left} vs {right})")]
    ResolutionMismatch { left: f64, right: f64 },
}

/// A row-set of per-cell metrics tagged with its operating resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    resolution: f64,
}

impl MetricTable {
    /// Create an empty table with the given schema.
    ///
    /// The first two columns must be `x` and `y` (the representative
    /// cell-center coordinates the buffer-trim step keys on).
    pub fn new(columns: Vec<String>, resolution: f64) -> Result<Self, TableError> {
        if columns.len() < 2 || columns[0] != "x" || columns[1] != "y" {
            return Err(TableError::MissingCoordinates(columns));
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
            resolution,
        })
    }

    /// Append one row; width must match the schema.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidthMismatch {
                got: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names, coordinates first.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in insertion order.
    #[inline]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The operating resolution this table was computed at.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Values of a named column, `None` if absent.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Drop every row whose X,Y coordinate falls outside `bbox`
    /// (edges inclusive).
    pub fn retain_within(&mut self, bbox: &BBox) {
        self.rows.retain(|r| bbox.contains_point(r[0], r[1]));
    }

    /// Concatenate tables in input order.
    ///
    /// Schemas and resolutions must agree; a mismatch means the engine
    /// mixed results from different runs, which is a bug upstream.
    pub fn concat(tables: Vec<MetricTable>) -> Result<MetricTable, TableError> {
        let mut iter = tables.into_iter();
        let Some(mut merged) = iter.next() else {
            // Callers handle the no-result case before merging; an empty
            // concat yields the minimal coordinate-only schema.
            return MetricTable::new(vec!["x".into(), "y".into()], 0.0);
        };
        for table in iter {
            if table.columns != merged.columns {
                return Err(TableError::SchemaMismatch {
                    left: merged.columns,
                    right: table.columns,
                });
            }
            if table.resolution != merged.resolution {
                return Err(TableError::ResolutionMismatch {
                    left: merged.resolution,
                    right: table.resolution,
                });
            }
            merged.rows.extend(table.rows);
        }
        Ok(merged)
    }
}

impl fmt::Display for MetricTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows x {} columns @ {}",
            self.n_rows(),
            self.columns.len(),
            self.resolution
        )
    }
}
