//! Point-cloud reader seam.
//!
//! File decoding is an external collaborator: the engine only needs to
//! read every point inside an arbitrary bounding box, independent of file
//! boundaries, with optional column selection and record filtering pushed
//! down to the reader. [`PointReader`] is that contract; the engine ships
//! [`InMemoryReader`] for tests and demos, and real backends (LAS/LAZ,
//! COPC, ...) live in their own crates.

mod memory;

use std::fmt;

use thiserror::Error;

use crate::geom::BBox;

pub use memory::InMemoryReader;

/// Errors surfaced by a reader backend.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// A source file could not be read or decoded
    #[error("failed to read source {source_id}: {message}")]
    SourceUnreadable { source_id: String, message: String },

    /// The filter expression was rejected by the backend
    #[error("invalid filter expression '{expression}': {message}")]
    InvalidFilter { expression: String, message: String },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One decoded point record.
///
/// X, Y, Z are always present; the remaining fields are populated only
/// when the query's column selection asked for them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: Option<f32>,
    pub classification: Option<u8>,
}

impl Point {
    /// A bare XYZ point with no extra columns.
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            intensity: None,
            classification: None,
        }
    }
}

/// Which point attributes the reader should decode.
///
/// Narrowing the selection lets backends skip decoding unused fields,
/// which dominates read time on large tiles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSelection {
    /// Decode every attribute the format stores.
    All,
    /// Coordinates only.
    #[default]
    Xyz,
    /// Coordinates plus the named attributes.
    Named(Vec<String>),
}

/// A buffered-region read request.
#[derive(Debug, Clone)]
pub struct ReadQuery {
    /// Region to read; typically a tile's buffered bbox.
    pub bbox: BBox,
    /// Attributes to decode.
    pub columns: ColumnSelection,
    /// Optional record-filter expression, interpreted by the backend
    /// (e.g. `"classification != 7"`). `None` keeps every record.
    pub filter: Option<String>,
}

impl ReadQuery {
    /// Query for every XYZ record inside `bbox`.
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            columns: ColumnSelection::default(),
            filter: None,
        }
    }

    /// Replace the column selection.
    #[must_use]
    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    /// Attach a record-filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// An owned set of points loaded for one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Wrap a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The loaded points.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Tight bounding box of the loaded points, `None` when empty.
    pub fn bounds(&self) -> Option<BBox> {
        let first = self.points.first()?;
        let mut bbox = BBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &self.points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }
}

impl fmt::Display for PointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} points", self.points.len())
    }
}

/// Reads points from the catalog's source files.
///
/// Implementations must serve any bounding box, stitching across file
/// boundaries as needed, and must return `Ok(None)` (not an error) when
/// the region holds no points; buffered regions routinely extend past
/// the catalog extent.
pub trait PointReader: Send + Sync {
    /// Read every point matching the query.
    fn read(&self, query: &ReadQuery) -> Result<Option<PointSet>, ReaderError>;
}
