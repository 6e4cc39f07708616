//! Engine facade: partition → guard → dispatch → merge.
//!
//! [`CatalogProcessor`] ties the components together behind one call:
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloudtiler::aggregate::{builtin::PointDensity, ArgBag};
//! use cloudtiler::memory::AbortPolicy;
//! use cloudtiler::process::{CatalogProcessor, ProcessOptions, RunOutcome};
//! use cloudtiler::progress::NullProgressSink;
//! use cloudtiler::reader::InMemoryReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = InMemoryReader::new(); // populated elsewhere
//! let catalog = reader.catalog()?;
//!
//! let processor = CatalogProcessor::new(catalog, Arc::new(reader), ProcessOptions::default());
//! let outcome = processor.run(
//!     Arc::new(PointDensity),
//!     ArgBag::new(),
//!     &AbortPolicy,
//!     Arc::new(NullProgressSink),
//! )?;
//!
//! match outcome {
//!     RunOutcome::Table(table) => println!("{} rows", table.n_rows()),
//!     RunOutcome::Mosaic(mosaic) => println!("{} tiles", mosaic.len()),
//!     RunOutcome::Aborted => println!("aborted by memory guard"),
//! }
//! # Ok(())
//! # }
//! ```

mod options;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::{AggregateFn, ArgBag};
use crate::catalog::Catalog;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::memory::{DecisionPolicy, GuardDecision, MemoryGuard};
use crate::merge::{merge_mosaic, merge_tables, MergeError};
use crate::partition::{make_tiles, CellSizeSpec, PartitionError, Tile};
use crate::progress::{sink_for, ProgressSink};
use crate::raster::{tile_file_name, MosaicHandle, RasterToolkit, TiffRasterWriter};
use crate::reader::PointReader;
use crate::table::MetricTable;
use crate::worker::TileWorker;

pub use options::{
    ProcessOptions, BUFFER_EXTENSION, DEFAULT_BUFFER, DEFAULT_CELL_SIZE, DEFAULT_RESOLUTION,
};

/// Errors surfaced by a catalog run.
///
/// A memory-guard abort is *not* an error; it comes back as
/// [`RunOutcome::Aborted`].
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The run configuration is inconsistent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Partitioning the extent failed
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// One or more tiles failed during dispatch
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Merging the results failed
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// The merged output of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// In-memory concatenated table.
    Table(MetricTable),
    /// Mosaic index over persisted tile rasters.
    Mosaic(MosaicHandle),
    /// The memory guard's policy chose to abort before dispatch. No tile
    /// was processed and no output exists.
    Aborted,
}

impl RunOutcome {
    /// Whether the run was aborted before dispatch.
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted)
    }

    /// The merged table, when the run produced one.
    pub fn table(&self) -> Option<&MetricTable> {
        match self {
            RunOutcome::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The mosaic handle, when the run produced one.
    pub fn mosaic(&self) -> Option<&MosaicHandle> {
        match self {
            RunOutcome::Mosaic(m) => Some(m),
            _ => None,
        }
    }
}

/// Runs a user aggregation across a catalog, tile by tile.
pub struct CatalogProcessor {
    catalog: Catalog,
    reader: Arc<dyn PointReader>,
    toolkit: Arc<dyn RasterToolkit>,
    options: ProcessOptions,
}

impl CatalogProcessor {
    /// Create a processor with the default TIFF raster toolkit.
    pub fn new(catalog: Catalog, reader: Arc<dyn PointReader>, options: ProcessOptions) -> Self {
        Self {
            catalog,
            reader,
            toolkit: Arc::new(TiffRasterWriter),
            options,
        }
    }

    /// Replace the raster toolkit (e.g. with a geo-aware writer).
    #[must_use]
    pub fn with_toolkit(mut self, toolkit: Arc<dyn RasterToolkit>) -> Self {
        self.toolkit = toolkit;
        self
    }

    /// The catalog this processor runs over.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Partition the catalog with the current options.
    ///
    /// Exposed separately so callers can inspect the layout without
    /// running anything.
    pub fn tiles(&self) -> Result<Vec<Tile>, ProcessError> {
        self.validate()?;
        Ok(make_tiles(
            self.catalog.extent(),
            &self.options.cell_spec,
            self.options.buffer,
            self.options.origin,
        )?)
    }

    /// Run the aggregation across every tile.
    ///
    /// `policy` is consulted only when the memory estimate exceeds the
    /// configured threshold and spilling was not already requested;
    /// `progress` receives events only when progress is enabled in the
    /// options.
    pub fn run(
        &self,
        func: Arc<dyn AggregateFn>,
        args: ArgBag,
        policy: &dyn DecisionPolicy,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<RunOutcome, ProcessError> {
        let tiles = self.tiles()?;

        // Go/no-go before any work is dispatched.
        let guard = MemoryGuard {
            warn_threshold: self.options.memory_threshold,
            bytes_per_cell: self.options.bytes_per_cell,
        };
        let estimate = guard.estimate(self.catalog.area(), self.options.resolution);
        let decision = guard.decide(estimate, self.options.spill, policy);
        debug!(estimate, %decision, tiles = tiles.len(), "memory guard decision");

        let persist = match decision {
            GuardDecision::Abort => {
                info!(estimate, "run aborted by memory guard policy");
                return Ok(RunOutcome::Aborted);
            }
            GuardDecision::ProceedSpilling => true,
            GuardDecision::Proceed => self.options.spill,
        };

        let export_dir = if persist {
            let dir = self.options.export_dir.clone().ok_or_else(|| {
                ProcessError::Configuration(
                    "spill-to-disk requires an export directory".to_string(),
                )
            })?;
            Some(dir)
        } else {
            None
        };

        // Persisted artifacts derive from the stable tile names.
        let tiles: Vec<Tile> = match &export_dir {
            Some(dir) => tiles
                .into_iter()
                .map(|t| {
                    let path = dir.join(tile_file_name(func.name(), t.index));
                    t.with_output_path(path)
                })
                .collect(),
            None => tiles,
        };

        let worker = TileWorker::new(
            Arc::clone(&self.reader),
            Arc::clone(&func),
            Arc::clone(&self.toolkit),
        )
        .with_args(args)
        .with_resolution(self.options.resolution)
        .with_origin(self.options.origin)
        .with_columns(self.options.columns.clone())
        .with_filter(self.options.filter.clone())
        .with_persist(persist);

        let sink = sink_for(self.options.progress, progress);
        let dispatcher = Dispatcher::new(self.options.workers);
        let results = dispatcher.run(tiles.clone(), Arc::new(worker), sink.as_ref())?;

        if let Some(dir) = export_dir {
            let mosaic = merge_mosaic(
                &dir,
                func.name(),
                &tiles,
                self.toolkit.as_ref(),
                self.options.resolution,
            )?;
            Ok(RunOutcome::Mosaic(mosaic))
        } else {
            let table = merge_tables(results, self.options.resolution)?;
            Ok(RunOutcome::Table(table))
        }
    }

    fn validate(&self) -> Result<(), ProcessError> {
        if self.options.buffer < 0.0 {
            return Err(ProcessError::Configuration(format!(
                "buffer must be non-negative, got {}",
                self.options.buffer
            )));
        }
        if self.options.resolution <= 0.0 {
            return Err(ProcessError::Configuration(format!(
                "resolution must be positive, got {}",
                self.options.resolution
            )));
        }
        if let CellSizeSpec::Uniform(size) = &self.options.cell_spec {
            if *size <= 0.0 {
                return Err(ProcessError::Configuration(format!(
                    "cell size must be positive, got {}",
                    size
                )));
            }
        }
        if self.options.spill && self.options.export_dir.is_none() {
            return Err(ProcessError::Configuration(
                "spill-to-disk requires an export directory".to_string(),
            ));
        }
        Ok(())
    }
}
