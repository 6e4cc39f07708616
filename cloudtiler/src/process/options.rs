//! Run configuration.
//!
//! All run state is carried by an explicit [`ProcessOptions`] value passed
//! into the engine; nothing is read from process-wide globals, so two runs
//! with the same options behave identically regardless of what ran before.

use std::path::PathBuf;

use crate::memory::{DEFAULT_BYTES_PER_CELL, DEFAULT_WARN_THRESHOLD};
use crate::partition::CellSizeSpec;
use crate::reader::ColumnSelection;

/// Default buffer width around each tile core, in catalog units.
pub const DEFAULT_BUFFER: f64 = 15.0;

/// Fixed amount [`ProcessOptions::with_extra_buffer`] widens the buffer
/// by, for algorithms that need a little more context than the default.
pub const BUFFER_EXTENSION: f64 = 5.0;

/// Default tiling cell size, in catalog units.
pub const DEFAULT_CELL_SIZE: f64 = 1000.0;

/// Default output resolution handed to the user function.
pub const DEFAULT_RESOLUTION: f64 = 20.0;

/// Configuration for one catalog run.
///
/// Built with defaults and adjusted through `with_*` methods:
///
/// ```
/// use cloudtiler::process::ProcessOptions;
///
/// let options = ProcessOptions::default()
///     .with_cell_size(500.0)
///     .with_buffer(30.0)
///     .with_workers(4);
/// ```
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Emit progress events.
    pub progress: bool,
    /// Buffer width around each tile core.
    pub buffer: f64,
    /// Worker pool size; `0` means all available cores. Always capped to
    /// the tile count at dispatch.
    pub workers: usize,
    /// Tiling cell size, uniform or mask-driven.
    pub cell_spec: CellSizeSpec,
    /// Output resolution handed to the user function.
    pub resolution: f64,
    /// Grid origin offset shared by every run on this catalog.
    pub origin: (f64, f64),
    /// Persist per-tile rasters instead of accumulating tables.
    pub spill: bool,
    /// Memory-warning threshold in bytes; `None` disables the guard.
    pub memory_threshold: Option<u64>,
    /// Estimated bytes per output cell for the memory estimate.
    pub bytes_per_cell: f64,
    /// Directory for persisted tiles and the mosaic index.
    pub export_dir: Option<PathBuf>,
    /// Column selection pushed down to the reader.
    pub columns: ColumnSelection,
    /// Record filter pushed down to the reader.
    pub filter: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            progress: true,
            buffer: DEFAULT_BUFFER,
            workers: 0,
            cell_spec: CellSizeSpec::Uniform(DEFAULT_CELL_SIZE),
            resolution: DEFAULT_RESOLUTION,
            origin: (0.0, 0.0),
            spill: false,
            memory_threshold: Some(DEFAULT_WARN_THRESHOLD),
            bytes_per_cell: DEFAULT_BYTES_PER_CELL,
            export_dir: None,
            columns: ColumnSelection::default(),
            filter: None,
        }
    }
}

impl ProcessOptions {
    /// Toggle progress reporting.
    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Set the buffer width.
    #[must_use]
    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }

    /// Widen the buffer by the fixed [`BUFFER_EXTENSION`].
    #[must_use]
    pub fn with_extra_buffer(mut self) -> Self {
        self.buffer += BUFFER_EXTENSION;
        self
    }

    /// Set the worker pool size (`0` = all cores).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Use a uniform tiling cell size.
    #[must_use]
    pub fn with_cell_size(mut self, size: f64) -> Self {
        self.cell_spec = CellSizeSpec::Uniform(size);
        self
    }

    /// Use an explicit cell-size specification (uniform or mask).
    #[must_use]
    pub fn with_cell_spec(mut self, spec: CellSizeSpec) -> Self {
        self.cell_spec = spec;
        self
    }

    /// Set the output resolution.
    #[must_use]
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the grid origin offset.
    #[must_use]
    pub fn with_origin(mut self, origin: (f64, f64)) -> Self {
        self.origin = origin;
        self
    }

    /// Toggle spill-to-disk output.
    #[must_use]
    pub fn with_spill(mut self, spill: bool) -> Self {
        self.spill = spill;
        self
    }

    /// Set the memory-warning threshold (`None` disables the guard).
    #[must_use]
    pub fn with_memory_threshold(mut self, threshold: Option<u64>) -> Self {
        self.memory_threshold = threshold;
        self
    }

    /// Set the export directory for persisted tiles.
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    /// Set the reader column selection.
    #[must_use]
    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    /// Set the reader record filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}
