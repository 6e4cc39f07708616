//! Grid construction: extent → ordered tiles.

use thiserror::Error;
use tracing::debug;

use super::tile::{CellSizeSpec, Tile};
use crate::geom::{snap_down, BBox};
use crate::mask::MaskError;

/// Errors produced while partitioning the catalog extent.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// Cell size must be strictly positive
    #[error("invalid cell size: {0}")]
    InvalidCellSize(f64),

    /// Buffer width must be non-negative
    #[error("invalid buffer width: {0}")]
    InvalidBuffer(f64),

    /// Mask geometry rejected (e.g. non-square resolution)
    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// Cover `extent` with an ordered set of buffered tiles.
///
/// With a uniform cell size the grid is phased through `origin`, so two
/// runs over different sub-extents still share cell edges. With a mask the
/// cell size and grid phase come from the mask itself and tiles whose core
/// intersects no occupied mask cell are dropped.
///
/// Cells at the extent edge are clipped to the extent for their core
/// region; their buffered region may still reach past the extent, which
/// simply yields no points at read time.
///
/// Tile indices are assigned sequentially (row-major from the south-west
/// corner, after mask pruning), so persisted artifacts are reproducible
/// across runs given identical inputs.
pub fn make_tiles(
    extent: BBox,
    spec: &CellSizeSpec,
    buffer: f64,
    origin: (f64, f64),
) -> Result<Vec<Tile>, PartitionError> {
    if buffer < 0.0 {
        return Err(PartitionError::InvalidBuffer(buffer));
    }

    let (cell, phase) = match spec {
        CellSizeSpec::Uniform(size) => (*size, origin),
        CellSizeSpec::FromMask(mask) => (mask.cell_size()?, mask.origin()),
    };
    if !(cell.is_finite() && cell > 0.0) {
        return Err(PartitionError::InvalidCellSize(cell));
    }

    let start_x = snap_down(extent.min_x, cell, phase.0);
    let start_y = snap_down(extent.min_y, cell, phase.1);

    // At least one column/row even for a degenerate (zero-span) extent.
    let cols = (((extent.max_x - start_x) / cell).ceil() as usize).max(1);
    let rows = (((extent.max_y - start_y) / cell).ceil() as usize).max(1);

    let mut tiles = Vec::with_capacity(cols * rows);
    let mut index = 0;
    for row in 0..rows {
        for col in 0..cols {
            let cell_box = BBox {
                min_x: start_x + col as f64 * cell,
                min_y: start_y + row as f64 * cell,
                max_x: start_x + (col + 1) as f64 * cell,
                max_y: start_y + (row + 1) as f64 * cell,
            };
            // Clip the core to the extent; skip slivers the snap produced
            // entirely outside it.
            let Some(core) = cell_box.clipped_to(&extent) else {
                continue;
            };
            if let Some(mask) = spec.mask() {
                if !mask.occupied_in(&core) {
                    continue;
                }
            }
            tiles.push(Tile::new(index, core, buffer));
            index += 1;
        }
    }

    debug!(
        tiles = tiles.len(),
        cell, buffer, "partitioned catalog extent"
    );
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mask::OccupancyMask;

    fn extent(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BBox {
        BBox::new(min_x, min_y, max_x, max_y).unwrap()
    }

    #[test]
    fn test_two_tile_scenario() {
        // [0,2000] x [0,1000] at cell 1000, buffer 0 -> exactly 2 tiles.
        let tiles = make_tiles(
            extent(0.0, 0.0, 2000.0, 1000.0),
            &CellSizeSpec::Uniform(1000.0),
            0.0,
            (0.0, 0.0),
        )
        .unwrap();

        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].core, extent(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(tiles[1].core, extent(1000.0, 0.0, 2000.0, 1000.0));
    }

    #[test]
    fn test_cores_partition_extent_no_gap_no_overlap() {
        let ext = extent(-250.0, 130.0, 2730.0, 1910.0);
        let tiles = make_tiles(ext, &CellSizeSpec::Uniform(500.0), 30.0, (0.0, 0.0)).unwrap();

        // Union area equals extent area when cores are disjoint and cover it.
        let total: f64 = tiles.iter().map(|t| t.core.area()).sum();
        assert!((total - ext.area()).abs() < 1e-6);

        for (i, a) in tiles.iter().enumerate() {
            // Core stays inside the extent.
            assert!(a.core.clipped_to(&ext).unwrap() == a.core);
            for b in tiles.iter().skip(i + 1) {
                // Any overlap between distinct cores has zero area.
                if let Some(overlap) = a.core.clipped_to(&b.core) {
                    assert!(overlap.area() < 1e-9, "{} overlaps {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_buffered_exceeds_extent_at_edges() {
        let tiles = make_tiles(
            extent(0.0, 0.0, 1000.0, 1000.0),
            &CellSizeSpec::Uniform(1000.0),
            25.0,
            (0.0, 0.0),
        )
        .unwrap();

        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].core, extent(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(tiles[0].buffered, extent(-25.0, -25.0, 1025.0, 1025.0));
    }

    #[test]
    fn test_buffered_equals_core_expanded_by_buffer() {
        for buffer in [1.0, 15.0, 42.5] {
            let tiles = make_tiles(
                extent(0.0, 0.0, 3000.0, 2000.0),
                &CellSizeSpec::Uniform(1000.0),
                buffer,
                (0.0, 0.0),
            )
            .unwrap();
            for tile in &tiles {
                assert_eq!(tile.buffered, tile.core.buffered(buffer));
            }
        }
    }

    #[test]
    fn test_origin_phase_alignment() {
        // Sub-extent starting mid-cell still snaps to the global grid.
        let tiles = make_tiles(
            extent(1500.0, 0.0, 2500.0, 1000.0),
            &CellSizeSpec::Uniform(1000.0),
            0.0,
            (0.0, 0.0),
        )
        .unwrap();

        assert_eq!(tiles.len(), 2);
        // First cell snapped to [1000,2000], clipped core starts at 1500.
        assert_eq!(tiles[0].core, extent(1500.0, 0.0, 2000.0, 1000.0));
        assert_eq!(tiles[1].core, extent(2000.0, 0.0, 2500.0, 1000.0));
    }

    #[test]
    fn test_nonzero_origin_offset() {
        let tiles = make_tiles(
            extent(0.0, 0.0, 1000.0, 500.0),
            &CellSizeSpec::Uniform(1000.0),
            0.0,
            (250.0, 0.0),
        )
        .unwrap();

        // Grid edges at ..., -750, 250, 1250, ... so two columns intersect.
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].core, extent(0.0, 0.0, 250.0, 500.0));
        assert_eq!(tiles[1].core, extent(250.0, 0.0, 1000.0, 500.0));
    }

    #[test]
    fn test_row_major_ordering_and_sequential_indices() {
        let tiles = make_tiles(
            extent(0.0, 0.0, 2000.0, 2000.0),
            &CellSizeSpec::Uniform(1000.0),
            0.0,
            (0.0, 0.0),
        )
        .unwrap();

        assert_eq!(tiles.len(), 4);
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.index, i);
            assert_eq!(tile.name, format!("ROI{}", i));
        }
        // Row-major from the south-west corner.
        assert_eq!(tiles[0].core, extent(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(tiles[1].core, extent(1000.0, 0.0, 2000.0, 1000.0));
        assert_eq!(tiles[2].core, extent(0.0, 1000.0, 1000.0, 2000.0));
    }

    #[test]
    fn test_mask_prunes_to_lower_left_quadrant() {
        // 2x2 tile extent; mask occupies only the lower-left quadrant.
        let mask =
            OccupancyMask::from_occupied_cells(0.0, 0.0, 1000.0, 2, 2, &[(0, 0)]).unwrap();
        let tiles = make_tiles(
            extent(0.0, 0.0, 2000.0, 2000.0),
            &CellSizeSpec::FromMask(Arc::new(mask)),
            0.0,
            (0.0, 0.0),
        )
        .unwrap();

        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].core, extent(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(tiles[0].index, 0);
    }

    #[test]
    fn test_mask_non_square_resolution_is_fatal() {
        let mask = OccupancyMask::new(0.0, 0.0, 10.0, 20.0, 2, 2, vec![true; 4]).unwrap();
        let result = make_tiles(
            extent(0.0, 0.0, 40.0, 40.0),
            &CellSizeSpec::FromMask(Arc::new(mask)),
            0.0,
            (0.0, 0.0),
        );
        assert!(matches!(
            result,
            Err(PartitionError::Mask(MaskError::NonSquareResolution { .. }))
        ));
    }

    #[test]
    fn test_mask_grid_uses_mask_phase() {
        // Mask origin at 500 shifts the grid phase away from (0,0).
        let mask =
            OccupancyMask::from_occupied_cells(500.0, 500.0, 1000.0, 2, 1, &[(0, 0), (1, 0)])
                .unwrap();
        let tiles = make_tiles(
            extent(500.0, 500.0, 2500.0, 1500.0),
            &CellSizeSpec::FromMask(Arc::new(mask)),
            0.0,
            (0.0, 0.0),
        )
        .unwrap();

        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].core, extent(500.0, 500.0, 1500.0, 1500.0));
    }

    #[test]
    fn test_degenerate_extent_yields_one_tile() {
        let tiles = make_tiles(
            extent(10.0, 10.0, 10.0, 10.0),
            &CellSizeSpec::Uniform(1000.0),
            5.0,
            (0.0, 0.0),
        )
        .unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].core, extent(10.0, 10.0, 10.0, 10.0));
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        let result = make_tiles(
            extent(0.0, 0.0, 100.0, 100.0),
            &CellSizeSpec::Uniform(0.0),
            0.0,
            (0.0, 0.0),
        );
        assert!(matches!(result, Err(PartitionError::InvalidCellSize(_))));
    }

    #[test]
    fn test_negative_buffer_rejected() {
        let result = make_tiles(
            extent(0.0, 0.0, 100.0, 100.0),
            &CellSizeSpec::Uniform(50.0),
            -1.0,
            (0.0, 0.0),
        );
        assert!(matches!(result, Err(PartitionError::InvalidBuffer(_))));
    }

    #[test]
    fn test_idempotent_tiling() {
        let run = || {
            make_tiles(
                extent(-130.0, 40.0, 3210.0, 1990.0),
                &CellSizeSpec::Uniform(750.0),
                20.0,
                (0.0, 0.0),
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }
}
