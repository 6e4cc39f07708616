//! Per-source-file catalog entry.

use std::path::PathBuf;

use crate::geom::BBox;

/// One source file in the catalog: identifier plus spatial footprint.
///
/// Entries are immutable once loaded. The bounding box comes from the file
/// header, so it can be gathered without decoding the point records.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Path (or opaque identifier) of the source file.
    pub source: PathBuf,
    /// Spatial footprint of the file's points.
    pub bbox: BBox,
    /// Number of point records the header declares.
    pub point_count: u64,
}

impl CatalogEntry {
    /// Create an entry for a source file.
    pub fn new(source: impl Into<PathBuf>, bbox: BBox, point_count: u64) -> Self {
        Self {
            source: source.into(),
            bbox,
            point_count,
        }
    }
}
