//! Fan-in: per-tile results → one logical output.
//!
//! Tabular mode concatenates the non-empty tables in submission order and
//! tags the result with the shared resolution. Mosaic mode scans the
//! export directory for the tiles the workers persisted and builds the
//! `.vrt` index over them; nothing is loaded into memory.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::partition::Tile;
use crate::raster::{mosaic_file_name, scan_tile_outputs, MosaicHandle, RasterError, RasterToolkit};
use crate::table::{MetricTable, TableError};
use crate::worker::TileResult;

/// Errors surfaced while merging results.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Tables disagreed on schema or resolution
    #[error(transparent)]
    Table(#[from] TableError),

    /// Mosaic assembly failed
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// A tabular merge received a persisted-file result
    #[error("tile {0} returned a persisted file during an in-memory merge")]
    UnexpectedPersisted(usize),

    /// A scanned tile file has no matching tile descriptor
    #[error("tile output index {index} does not match any dispatched tile (stale file in export dir?)")]
    UnknownTileOutput { index: usize },
}

/// Concatenate tabular results in submission order.
///
/// Empty results are skipped; a run where every tile came back empty
/// yields an empty table tagged with the operating resolution.
pub fn merge_tables(
    results: Vec<TileResult>,
    resolution: f64,
) -> Result<MetricTable, MergeError> {
    let mut tables = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            TileResult::Table(table) => tables.push(table),
            TileResult::Empty => {}
            TileResult::Persisted(_) => {
                return Err(MergeError::UnexpectedPersisted(index));
            }
        }
    }
    if tables.is_empty() {
        return Ok(MetricTable::new(vec!["x".into(), "y".into()], resolution)?);
    }
    let merged = MetricTable::concat(tables)?;
    debug!(rows = merged.n_rows(), "merged tabular results");
    Ok(merged)
}

/// Index the persisted tile files into a virtual mosaic.
///
/// Scans `export_dir` for `<func_name>_ROI<k>.tiff`, pairs each file with
/// its tile's core footprint, and writes `<func_name>.vrt` referencing
/// them in tile order.
pub fn merge_mosaic(
    export_dir: &Path,
    func_name: &str,
    tiles: &[Tile],
    toolkit: &dyn RasterToolkit,
    resolution: f64,
) -> Result<MosaicHandle, MergeError> {
    let scanned = scan_tile_outputs(export_dir, func_name)?;

    let mut sources = Vec::with_capacity(scanned.len());
    for (index, path) in scanned {
        let tile = tiles
            .get(index)
            .filter(|t| t.index == index)
            .ok_or(MergeError::UnknownTileOutput { index })?;
        sources.push((path, tile.core));
    }

    let vrt_path = export_dir.join(mosaic_file_name(func_name));
    let handle = toolkit.build_mosaic(&sources, &vrt_path, resolution)?;
    debug!(
        tiles = handle.len(),
        vrt = %handle.vrt_path.display(),
        "merged mosaic"
    );
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BBox;
    use crate::raster::TiffRasterWriter;

    fn table(rows: &[(f64, f64, f64)], res: f64) -> MetricTable {
        let mut t =
            MetricTable::new(vec!["x".into(), "y".into(), "density".into()], res).unwrap();
        for &(x, y, d) in rows {
            t.push_row(vec![x, y, d]).unwrap();
        }
        t
    }

    #[test]
    fn test_merge_tables_skips_empty() {
        let merged = merge_tables(
            vec![
                TileResult::Table(table(&[(5.0, 5.0, 1.0)], 10.0)),
                TileResult::Empty,
                TileResult::Table(table(&[(15.0, 5.0, 2.0)], 10.0)),
            ],
            10.0,
        )
        .unwrap();

        assert_eq!(merged.n_rows(), 2);
        assert_eq!(merged.column("density").unwrap(), vec![1.0, 2.0]);
        assert_eq!(merged.resolution(), 10.0);
    }

    #[test]
    fn test_merge_tables_all_empty() {
        let merged = merge_tables(vec![TileResult::Empty, TileResult::Empty], 20.0).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.resolution(), 20.0);
    }

    #[test]
    fn test_merge_tables_rejects_persisted() {
        let result = merge_tables(
            vec![TileResult::Persisted(std::path::PathBuf::from("x.tiff"))],
            10.0,
        );
        assert!(matches!(result, Err(MergeError::UnexpectedPersisted(0))));
    }

    #[test]
    fn test_merge_mosaic_pairs_files_with_tiles() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["density_ROI0.tiff", "density_ROI1.tiff"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let tiles = vec![
            Tile::new(0, BBox::new(0.0, 0.0, 100.0, 100.0).unwrap(), 0.0),
            Tile::new(1, BBox::new(100.0, 0.0, 200.0, 100.0).unwrap(), 0.0),
        ];

        let handle =
            merge_mosaic(dir.path(), "density", &tiles, &TiffRasterWriter, 10.0).unwrap();

        assert_eq!(handle.len(), 2);
        assert_eq!(
            handle.extent,
            BBox::new(0.0, 0.0, 200.0, 100.0).unwrap()
        );
        assert!(handle.vrt_path.exists());
    }

    #[test]
    fn test_merge_mosaic_skips_missing_tiles() {
        // Only tile 1 persisted anything (tile 0 was empty).
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("density_ROI1.tiff"), b"x").unwrap();
        let tiles = vec![
            Tile::new(0, BBox::new(0.0, 0.0, 100.0, 100.0).unwrap(), 0.0),
            Tile::new(1, BBox::new(100.0, 0.0, 200.0, 100.0).unwrap(), 0.0),
        ];

        let handle =
            merge_mosaic(dir.path(), "density", &tiles, &TiffRasterWriter, 10.0).unwrap();

        assert_eq!(handle.len(), 1);
        assert_eq!(
            handle.extent,
            BBox::new(100.0, 0.0, 200.0, 100.0).unwrap()
        );
    }

    #[test]
    fn test_merge_mosaic_rejects_stale_outputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("density_ROI7.tiff"), b"x").unwrap();
        let tiles = vec![Tile::new(0, BBox::new(0.0, 0.0, 100.0, 100.0).unwrap(), 0.0)];

        let result = merge_mosaic(dir.path(), "density", &tiles, &TiffRasterWriter, 10.0);
        assert!(matches!(
            result,
            Err(MergeError::UnknownTileOutput { index: 7 })
        ));
    }
}
