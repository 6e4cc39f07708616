//! Per-tile processing.
//!
//! A [`TileWorker`] bundles the reader, the user function and the run
//! parameters, and turns one [`Tile`] into one [`TileResult`]:
//!
//! 1. read the tile's buffered region,
//! 2. hand the points to the user function,
//! 3. trim buffer-origin rows so each physical location is contributed by
//!    exactly one tile,
//! 4. return the table, or persist it as a raster when spilling.
//!
//! Workers hold only shared read-only state, so one instance is cloned
//! behind an `Arc` across the whole pool.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::aggregate::{AggregateError, AggregateFn, ArgBag};
use crate::partition::Tile;
use crate::raster::{GridRaster, RasterError, RasterToolkit};
use crate::reader::{ColumnSelection, PointReader, ReadQuery, ReaderError};
use crate::table::MetricTable;

/// Errors surfaced while processing one tile.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reading the buffered region failed
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// The user function failed
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Persisting the tile raster failed
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Persistence was requested but the tile carries no output path
    #[error("tile {0} has no output path for persistence")]
    MissingOutputPath(String),
}

/// Result of processing one tile.
#[derive(Debug, Clone)]
pub enum TileResult {
    /// The buffered read or the trimmed output was empty. Not an error;
    /// the merger skips it.
    Empty,
    /// Trimmed tabular output, tagged with the operating resolution.
    Table(MetricTable),
    /// Output was rasterized and persisted; only the path travels back.
    Persisted(PathBuf),
}

impl TileResult {
    /// Whether this result carries no data.
    pub fn is_empty(&self) -> bool {
        matches!(self, TileResult::Empty)
    }
}

/// Shared per-run state for processing tiles.
pub struct TileWorker {
    reader: Arc<dyn PointReader>,
    func: Arc<dyn AggregateFn>,
    toolkit: Arc<dyn RasterToolkit>,
    args: ArgBag,
    resolution: f64,
    origin: (f64, f64),
    columns: ColumnSelection,
    filter: Option<String>,
    persist: bool,
}

impl TileWorker {
    /// Create a worker with the run's defaults.
    pub fn new(
        reader: Arc<dyn PointReader>,
        func: Arc<dyn AggregateFn>,
        toolkit: Arc<dyn RasterToolkit>,
    ) -> Self {
        Self {
            reader,
            func,
            toolkit,
            args: ArgBag::new(),
            resolution: 20.0,
            origin: (0.0, 0.0),
            columns: ColumnSelection::default(),
            filter: None,
            persist: false,
        }
    }

    /// Extra arguments forwarded to the user function.
    #[must_use]
    pub fn with_args(mut self, args: ArgBag) -> Self {
        self.args = args;
        self
    }

    /// Output resolution handed to the user function.
    #[must_use]
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Grid origin offset shared by all tiles.
    #[must_use]
    pub fn with_origin(mut self, origin: (f64, f64)) -> Self {
        self.origin = origin;
        self
    }

    /// Column selection pushed down to the reader.
    #[must_use]
    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    /// Record filter pushed down to the reader.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Persist trimmed output as a raster instead of returning it.
    #[must_use]
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// The user function's name.
    pub fn func_name(&self) -> &str {
        self.func.name()
    }

    /// Process one tile.
    pub fn process(&self, tile: &Tile) -> Result<TileResult, WorkerError> {
        let mut query = ReadQuery::new(tile.buffered).with_columns(self.columns.clone());
        if let Some(filter) = &self.filter {
            query = query.with_filter(filter.clone());
        }

        let Some(points) = self.reader.read(&query)? else {
            debug!(tile = %tile.name, "buffered region holds no points");
            return Ok(TileResult::Empty);
        };

        let mut table = self
            .func
            .apply(&points, self.resolution, self.origin, &self.args)?;

        // Keep only rows whose cell center lies in the core shrunk by half
        // a cell per side. Centers sit at half-cell offsets on the shared
        // grid, so every seam cell survives in exactly one tile.
        table.retain_within(&tile.core.shrunk(self.resolution / 2.0));

        if table.is_empty() {
            debug!(tile = %tile.name, "no rows left after buffer trim");
            return Ok(TileResult::Empty);
        }

        if self.persist {
            let path = tile
                .output_path
                .clone()
                .ok_or_else(|| WorkerError::MissingOutputPath(tile.name.clone()))?;
            let raster = GridRaster::from_table(&table)?;
            self.toolkit.write_tile(&raster, &path)?;
            debug!(tile = %tile.name, path = %path.display(), "persisted tile output");
            return Ok(TileResult::Persisted(path));
        }

        Ok(TileResult::Table(table))
    }
}
