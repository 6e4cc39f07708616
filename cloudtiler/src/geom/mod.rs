//! Planar geometry primitives.
//!
//! Provides the axis-aligned bounding box type used for catalog extents,
//! tile core regions and buffered read regions. Coordinates are in the
//! catalog's projected units (typically metres); this module is agnostic
//! to the actual CRS.

mod types;

pub use types::{BBox, GeomError};


/// Snap a coordinate down onto a grid of the given cell size, phased so the
/// grid passes through `origin`.
///
/// Repeated runs over different sub-extents share cell edges as long as
/// they use the same origin and cell size.
#[inline]
pub fn snap_down(value: f64, cell: f64, origin: f64) -> f64 {
    origin + ((value - origin) / cell).floor() * cell
}
