//! User aggregation function seam.
//!
//! The per-tile computation is an opaque callable supplied by the caller.
//! [`AggregateFn`] narrows the original variadic surface to one typed
//! signature: points in, resolution and grid origin, an explicit
//! [`ArgBag`] of extra arguments, and a [`MetricTable`] out whose rows
//! carry representative X,Y cell centers (the buffer-trim step keys on
//! them).
//!
//! [`builtin`] provides the standard metrics shipped with the engine.

pub mod builtin;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::reader::PointSet;
use crate::table::{MetricTable, TableError};

/// Errors surfaced by a user aggregation function.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The function rejected its inputs
    #[error("aggregation rejected input: {0}")]
    InvalidInput(String),

    /// The function's output table was malformed
    #[error(transparent)]
    Table(#[from] TableError),

    /// The function failed internally
    #[error("aggregation failed: {0}")]
    Failed(String),
}

/// One extra argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Int(v) => write!(f, "{}", v),
            ArgValue::Bool(v) => write!(f, "{}", v),
            ArgValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Typed key-value bag of extra arguments for the user function.
///
/// Replaces implicit variadic forwarding: callers state every extra
/// argument by name, and functions read them back with typed accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgBag {
    values: BTreeMap<String, ArgValue>,
}

impl ArgBag {
    /// An empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an argument.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: ArgValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    /// Float argument, `None` when absent or differently typed.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Bool argument.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text argument.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ArgValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A user-supplied per-tile aggregation.
///
/// # Contract
///
/// Output rows must carry representative X,Y cell-center coordinates in
/// the first two columns, computed on the shared grid defined by
/// `resolution` and `origin`. The engine trims buffer-origin rows by
/// those coordinates; rows placed off-grid may be dropped or
/// double-counted at tile seams.
pub trait AggregateFn: Send + Sync {
    /// Short name; persisted artifacts (`<name>_ROI<k>.tiff`) derive from it.
    fn name(&self) -> &str;

    /// Compute per-cell metrics for one tile's buffered point set.
    fn apply(
        &self,
        points: &PointSet,
        resolution: f64,
        origin: (f64, f64),
        args: &ArgBag,
    ) -> Result<MetricTable, AggregateError>;
}
