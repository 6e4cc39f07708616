//! Tile descriptor and cell-size specification.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::geom::BBox;
use crate::mask::OccupancyMask;

/// How the tiling cell size is chosen.
///
/// Either a uniform size in catalog units, or the resolution of an
/// externally supplied occupancy mask (which then also prunes empty tiles).
#[derive(Debug, Clone)]
pub enum CellSizeSpec {
    /// Regular grid of `size × size` cells.
    Uniform(f64),
    /// Cell size and pruning both taken from the mask.
    FromMask(Arc<OccupancyMask>),
}

impl CellSizeSpec {
    /// Whether this spec carries a pruning mask.
    pub fn mask(&self) -> Option<&OccupancyMask> {
        match self {
            CellSizeSpec::Uniform(_) => None,
            CellSizeSpec::FromMask(mask) => Some(mask),
        }
    }
}

/// One spatial partition unit.
///
/// `core` is the region this tile owns exclusively; `buffered` is `core`
/// expanded by the run's buffer width and is used only for reading input,
/// so edge-effect algorithms see real neighboring points instead of
/// padding. Tiles are created by the partitioner, consumed exactly once by
/// a worker, and dropped after their result is merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Position in submission order; also the stable naming index.
    pub index: usize,
    /// Non-overlapping region this tile owns.
    pub core: BBox,
    /// Core expanded by the buffer width on all sides; may extend past the
    /// catalog extent (the reader simply yields nothing out there).
    pub buffered: BBox,
    /// Stable name, `ROI{index}`; persisted artifacts derive from it.
    pub name: String,
    /// Destination for the persisted raster when spilling to disk.
    pub output_path: Option<PathBuf>,
}

impl Tile {
    /// Create a tile from its core region and buffer width.
    pub fn new(index: usize, core: BBox, buffer: f64) -> Self {
        Self {
            index,
            core,
            buffered: core.buffered(buffer),
            name: format!("ROI{}", index),
            output_path: None,
        }
    }

    /// Attach the output path used when persisting this tile's raster.
    #[must_use]
    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    /// Width of the buffer margin on each side.
    #[inline]
    pub fn buffer_width(&self) -> f64 {
        self.core.min_x - self.buffered.min_x
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} core {}", self.name, self.core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_buffered_and_name() {
        let core = BBox::new(0.0, 0.0, 1000.0, 1000.0).unwrap();
        let tile = Tile::new(3, core, 15.0);
        assert_eq!(tile.name, "ROI3");
        assert_eq!(tile.buffered, BBox::new(-15.0, -15.0, 1015.0, 1015.0).unwrap());
        assert_eq!(tile.buffer_width(), 15.0);
        assert!(tile.output_path.is_none());
    }

    #[test]
    fn test_zero_buffer() {
        let core = BBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let tile = Tile::new(0, core, 0.0);
        assert_eq!(tile.core, tile.buffered);
        assert_eq!(tile.buffer_width(), 0.0);
    }

    #[test]
    fn test_with_output_path() {
        let core = BBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let tile = Tile::new(0, core, 0.0).with_output_path(PathBuf::from("/tmp/out.tiff"));
        assert_eq!(tile.output_path.unwrap(), PathBuf::from("/tmp/out.tiff"));
    }

    #[test]
    fn test_display() {
        let core = BBox::new(0.0, 0.0, 10.0, 20.0).unwrap();
        let tile = Tile::new(1, core, 0.0);
        assert_eq!(format!("{}", tile), "ROI1 core [0, 10] x [0, 20]");
    }
}
