//! Raster output and mosaic indexing.
//!
//! Raster file I/O is an external collaborator behind the
//! [`RasterToolkit`] seam. The engine ships a plain default:
//! [`TiffRasterWriter`], which rasterizes a tile's metric table onto its
//! grid and encodes band 0 as a 16-bit grayscale TIFF via the `image`
//! crate, plus a GDAL-style `.vrt` index that composes the persisted
//! tiles into one addressable mosaic without loading them. Deployments
//! with geo-aware stacks plug their own toolkit in.

mod grid;
mod tiff;
mod vrt;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::geom::BBox;

pub use grid::GridRaster;
pub use tiff::TiffRasterWriter;
pub use vrt::{build_vrt, scan_tile_outputs, MosaicHandle};

/// File extension for persisted tile rasters.
pub const TILE_EXTENSION: &str = "tiff";

/// Errors surfaced by raster output.
#[derive(Debug, Error)]
pub enum RasterError {
    /// A table with no rows cannot be rasterized
    #[error("cannot rasterize an empty table")]
    EmptyTable,

    /// Table rows do not line up with the grid
    #[error("table is not grid-shaped: {0}")]
    NotGridShaped(String),

    /// Encoding the raster failed
    #[error("raster encoding failed for {path}: {message}")]
    EncodingFailed { path: PathBuf, message: String },

    /// No persisted tiles were found to mosaic
    #[error("no tile outputs matching '{pattern}' in {dir}")]
    NoTiles { dir: PathBuf, pattern: String },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Writes per-tile rasters and composes them into a mosaic.
pub trait RasterToolkit: Send + Sync {
    /// Rasterize and persist one tile's output.
    fn write_tile(&self, raster: &GridRaster, path: &Path) -> Result<(), RasterError>;

    /// Build the mosaic index referencing the persisted tiles.
    fn build_mosaic(
        &self,
        tiles: &[(PathBuf, BBox)],
        vrt_path: &Path,
        resolution: f64,
    ) -> Result<MosaicHandle, RasterError>;
}

/// File name of a persisted tile: `<func>_ROI<index>.tiff`.
pub fn tile_file_name(func_name: &str, tile_index: usize) -> String {
    format!("{}_ROI{}.{}", func_name, tile_index, TILE_EXTENSION)
}

/// File name of the mosaic index: `<func>.vrt`.
pub fn mosaic_file_name(func_name: &str) -> String {
    format!("{}.vrt", func_name)
}
