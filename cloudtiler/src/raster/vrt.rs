//! Virtual mosaic index.
//!
//! The mosaic is a GDAL-style `.vrt` XML file referencing the persisted
//! tile rasters. Nothing is loaded or re-encoded: the index addresses the
//! tiles lazily, which is the point of spilling in the first place.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{RasterError, TILE_EXTENSION};
use crate::geom::BBox;

/// Handle to a composed mosaic.
///
/// Tile core footprints cover the mosaic extent with no gaps and no
/// overlaps; the handle references the files without loading them.
#[derive(Debug, Clone)]
pub struct MosaicHandle {
    /// The `.vrt` index file.
    pub vrt_path: PathBuf,
    /// Referenced tile rasters, in tile-index order.
    pub tiles: Vec<PathBuf>,
    /// Combined footprint of the referenced tiles.
    pub extent: BBox,
    /// Cell size shared by every tile.
    pub resolution: f64,
}

impl MosaicHandle {
    /// Number of referenced tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the mosaic references no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Scan a directory for persisted tile outputs of one function.
///
/// Matches `<func_name>_ROI<index>.tiff` and returns `(index, path)`
/// pairs sorted by tile index, so the mosaic is assembled in submission
/// order regardless of filesystem iteration order.
pub fn scan_tile_outputs(
    dir: &Path,
    func_name: &str,
) -> Result<Vec<(usize, PathBuf)>, RasterError> {
    let prefix = format!("{}_ROI", func_name);
    let suffix = format!(".{}", TILE_EXTENSION);

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };
        let Some(index_str) = rest.strip_suffix(&suffix) else {
            continue;
        };
        let Ok(index) = index_str.parse::<usize>() else {
            continue;
        };
        found.push((index, entry.path()));
    }
    found.sort_by_key(|(index, _)| *index);
    Ok(found)
}

/// Write the `.vrt` index for a set of persisted tiles.
///
/// `tiles` pairs each file with its core footprint; the mosaic extent is
/// their union and the geotransform is derived from it (north-up, square
/// cells).
pub fn build_vrt(
    tiles: &[(PathBuf, BBox)],
    vrt_path: &Path,
    resolution: f64,
) -> Result<MosaicHandle, RasterError> {
    let Some((_, first)) = tiles.first() else {
        return Err(RasterError::NoTiles {
            dir: vrt_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            pattern: format!("*.{}", TILE_EXTENSION),
        });
    };
    let extent = tiles.iter().skip(1).fold(*first, |acc, (_, b)| acc.union(b));

    let raster_x = (extent.width() / resolution).round().max(1.0) as usize;
    let raster_y = (extent.height() / resolution).round().max(1.0) as usize;

    let mut xml = String::new();
    xml.push_str(&format!(
        "<VRTDataset rasterXSize=\"{}\" rasterYSize=\"{}\">\n",
        raster_x, raster_y
    ));
    // North-up geotransform: top-left corner, positive x step, negative y.
    xml.push_str(&format!(
        "  <GeoTransform>{}, {}, 0, {}, 0, -{}</GeoTransform>\n",
        extent.min_x, resolution, extent.max_y, resolution
    ));
    xml.push_str("  <VRTRasterBand dataType=\"Float32\" band=\"1\">\n");
    xml.push_str("    <NoDataValue>0</NoDataValue>\n");
    for (path, bbox) in tiles {
        let cols = (bbox.width() / resolution).round().max(1.0) as usize;
        let rows = (bbox.height() / resolution).round().max(1.0) as usize;
        let x_off = ((bbox.min_x - extent.min_x) / resolution).round() as usize;
        let y_off = ((extent.max_y - bbox.max_y) / resolution).round() as usize;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        xml.push_str("    <SimpleSource>\n");
        xml.push_str(&format!(
            "      <SourceFilename relativeToVRT=\"1\">{}</SourceFilename>\n",
            file_name
        ));
        xml.push_str("      <SourceBand>1</SourceBand>\n");
        xml.push_str(&format!(
            "      <SrcRect xOff=\"0\" yOff=\"0\" xSize=\"{}\" ySize=\"{}\"/>\n",
            cols, rows
        ));
        xml.push_str(&format!(
            "      <DstRect xOff=\"{}\" yOff=\"{}\" xSize=\"{}\" ySize=\"{}\"/>\n",
            x_off, y_off, cols, rows
        ));
        xml.push_str("    </SimpleSource>\n");
    }
    xml.push_str("  </VRTRasterBand>\n");
    xml.push_str("</VRTDataset>\n");

    if let Some(parent) = vrt_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(vrt_path)?;
    file.write_all(xml.as_bytes())?;

    debug!(
        vrt = %vrt_path.display(),
        tiles = tiles.len(),
        "built mosaic index"
    );

    Ok(MosaicHandle {
        vrt_path: vrt_path.to_path_buf(),
        tiles: tiles.iter().map(|(p, _)| p.clone()).collect(),
        extent,
        resolution,
    })
}
