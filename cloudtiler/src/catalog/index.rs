//! The catalog index: ordered entries plus derived total extent.

use thiserror::Error;

use super::entry::CatalogEntry;
use crate::geom::BBox;

/// Errors produced while assembling a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No entries were supplied
    #[error("catalog has no entries")]
    Empty,
}

/// Ordered set of source files with their combined spatial extent.
///
/// The extent and area answer coarse queries only: the area feeds the
/// memory estimate before a run, not precise per-tile accounting.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    extent: BBox,
}

impl Catalog {
    /// Build a catalog from per-file entries.
    ///
    /// Entry order is preserved; the total extent is the union of all
    /// entry boxes.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut iter = entries.iter();
        let first = iter.next().ok_or(CatalogError::Empty)?;
        let extent = iter.fold(first.bbox, |acc, e| acc.union(&e.bbox));
        Ok(Self { entries, extent })
    }

    /// Combined extent of all source files.
    #[inline]
    pub fn extent(&self) -> BBox {
        self.extent
    }

    /// Extent width times height, in squared catalog units.
    #[inline]
    pub fn area(&self) -> f64 {
        self.extent.area()
    }

    /// Ordered per-file entries.
    #[inline]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of source files.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no files.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the header-declared point counts across all files.
    pub fn total_points(&self) -> u64 {
        self.entries.iter().map(|e| e.point_count).sum()
    }
}
