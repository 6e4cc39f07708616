//! Grid raster assembled from a metric table.

use std::collections::BTreeMap;

use super::RasterError;
use crate::geom::BBox;
use crate::table::MetricTable;

/// A single- or multi-band raster on the run's shared grid.
///
/// Built from a tile's trimmed metric table: each row lands in the cell
/// whose center it carries. Cells with no row hold NaN (nodata).
#[derive(Debug, Clone)]
pub struct GridRaster {
    /// South-west corner of the grid.
    pub origin: (f64, f64),
    /// Cell size.
    pub resolution: f64,
    /// Columns (east-west).
    pub cols: usize,
    /// Rows (north-south).
    pub rows: usize,
    /// Band names, in table column order.
    pub band_names: Vec<String>,
    /// Band data, row-major from the south-west corner, NaN = nodata.
    pub bands: Vec<Vec<f64>>,
}

impl GridRaster {
    /// Rasterize a metric table.
    ///
    /// The grid footprint is the tight cell-aligned box around the rows'
    /// cell centers. Every non-coordinate column becomes a band.
    pub fn from_table(table: &MetricTable) -> Result<Self, RasterError> {
        if table.is_empty() {
            return Err(RasterError::EmptyTable);
        }
        let resolution = table.resolution();
        if resolution <= 0.0 {
            return Err(RasterError::NotGridShaped(format!(
                "resolution {} is not positive",
                resolution
            )));
        }

        // Cell indices keyed by the centers; centers sit at half-cell
        // offsets, so flooring center/resolution recovers the index.
        let mut cells: BTreeMap<(i64, i64), &Vec<f64>> = BTreeMap::new();
        let mut min_col = i64::MAX;
        let mut max_col = i64::MIN;
        let mut min_row = i64::MAX;
        let mut max_row = i64::MIN;
        for row in table.rows() {
            let col_idx = (row[0] / resolution).floor() as i64;
            let row_idx = (row[1] / resolution).floor() as i64;
            min_col = min_col.min(col_idx);
            max_col = max_col.max(col_idx);
            min_row = min_row.min(row_idx);
            max_row = max_row.max(row_idx);
            cells.insert((row_idx, col_idx), row);
        }

        let cols = (max_col - min_col + 1) as usize;
        let rows = (max_row - min_row + 1) as usize;
        let band_names: Vec<String> = table.columns()[2..].to_vec();
        let mut bands = vec![vec![f64::NAN; cols * rows]; band_names.len()];

        for ((row_idx, col_idx), values) in cells {
            let r = (row_idx - min_row) as usize;
            let c = (col_idx - min_col) as usize;
            for (band, data) in bands.iter_mut().enumerate() {
                data[r * cols + c] = values[2 + band];
            }
        }

        Ok(Self {
            origin: (min_col as f64 * resolution, min_row as f64 * resolution),
            resolution,
            cols,
            rows,
            band_names,
            bands,
        })
    }

    /// Footprint of the raster.
    pub fn extent(&self) -> BBox {
        BBox {
            min_x: self.origin.0,
            min_y: self.origin.1,
            max_x: self.origin.0 + self.cols as f64 * self.resolution,
            max_y: self.origin.1 + self.rows as f64 * self.resolution,
        }
    }

    /// Value of a band at (col, row), counting rows from the south.
    pub fn value(&self, band: usize, col: usize, row: usize) -> f64 {
        self.bands[band][row * self.cols + col]
    }
}
