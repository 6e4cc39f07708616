//! Default TIFF tile writer.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};
use tracing::debug;

use super::vrt::{build_vrt, MosaicHandle};
use super::{GridRaster, RasterError, RasterToolkit};
use crate::geom::BBox;

/// Plain TIFF writer over the `image` crate.
///
/// Encodes band 0 as 16-bit grayscale, linearly scaled over the band's
/// value range; nodata cells map to 0. Geo-referencing lives in the
/// accompanying `.vrt` index, not in the TIFF itself. Good enough for
/// spill-to-disk round trips and visual inspection; deployments that need
/// GeoTIFF tags plug a geo-aware [`RasterToolkit`] instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffRasterWriter;

impl TiffRasterWriter {
    /// Scale a band onto u16, mapping nodata to 0.
    fn quantize(data: &[f64]) -> Vec<u16> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in data {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        let span = hi - lo;
        data.iter()
            .map(|&v| {
                if !v.is_finite() {
                    0
                } else if span <= 0.0 {
                    1
                } else {
                    // Reserve 0 for nodata.
                    (1.0 + (v - lo) / span * (u16::MAX as f64 - 1.0)).round() as u16
                }
            })
            .collect()
    }
}

impl RasterToolkit for TiffRasterWriter {
    fn write_tile(&self, raster: &GridRaster, path: &Path) -> Result<(), RasterError> {
        let quantized = Self::quantize(&raster.bands[0]);

        // Image rows run north to south; grid rows run south to north.
        let width = raster.cols as u32;
        let height = raster.rows as u32;
        let image: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(width, height, |x, y| {
                let grid_row = raster.rows - 1 - y as usize;
                Luma([quantized[grid_row * raster.cols + x as usize]])
            });

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image
            .save_with_format(path, image::ImageFormat::Tiff)
            .map_err(|e| RasterError::EncodingFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!(path = %path.display(), width, height, "wrote tile raster");
        Ok(())
    }

    fn build_mosaic(
        &self,
        tiles: &[(PathBuf, BBox)],
        vrt_path: &Path,
        resolution: f64,
    ) -> Result<MosaicHandle, RasterError> {
        build_vrt(tiles, vrt_path, resolution)
    }
}
