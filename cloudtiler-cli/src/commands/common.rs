//! Shared pieces for the CLI commands.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use clap::Args;

use cloudtiler::process::ProcessOptions;
use cloudtiler::progress::{ProgressEvent, ProgressSink};
use cloudtiler::reader::{InMemoryReader, Point};

use crate::error::CliError;

/// Flags shared by every command that needs a catalog.
///
/// The CLI runs against a deterministic synthetic catalog: a row-major
/// grid of square source files filled with pseudo-random points. Real
/// deployments construct a [`cloudtiler::catalog::Catalog`] from their
/// reader backend instead.
#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Number of synthetic source files along each axis
    #[arg(long, default_value = "3")]
    pub grid: usize,

    /// Side length of each synthetic file footprint, in catalog units
    #[arg(long, default_value = "1000")]
    pub file_size: f64,

    /// Points generated per synthetic file
    #[arg(long, default_value = "2000")]
    pub points_per_file: usize,

    /// Seed for the synthetic point generator
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

impl CatalogArgs {
    /// Build the synthetic reader this invocation describes.
    pub fn build_reader(&self) -> Result<InMemoryReader, CliError> {
        if self.grid == 0 || self.points_per_file == 0 || self.file_size <= 0.0 {
            return Err(CliError::Catalog(
                "grid, file size and points per file must be positive".to_string(),
            ));
        }

        // Xorshift generator; deterministic for a given seed so repeated
        // invocations see the same catalog.
        let mut state = self.seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let mut reader = InMemoryReader::new();
        for row in 0..self.grid {
            for col in 0..self.grid {
                let x0 = col as f64 * self.file_size;
                let y0 = row as f64 * self.file_size;
                let points: Vec<Point> = (0..self.points_per_file)
                    .map(|_| {
                        Point::xyz(
                            x0 + next() * self.file_size,
                            y0 + next() * self.file_size,
                            next() * 40.0,
                        )
                    })
                    .collect();
                reader = reader
                    .add_source(format!("synthetic_{}_{}.las", col, row), points)
                    .map_err(|e| CliError::Catalog(e.to_string()))?;
            }
        }
        Ok(reader)
    }
}

/// Flags mapped onto [`ProcessOptions`]; config-file values sit between
/// the library defaults and these flags.
#[derive(Debug, Args)]
pub struct OptionArgs {
    /// Tiling cell size in catalog units
    #[arg(long)]
    pub cell_size: Option<f64>,

    /// Buffer width around each tile core
    #[arg(long)]
    pub buffer: Option<f64>,

    /// Output resolution handed to the aggregation
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Worker pool size (0 = all cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Disable progress output
    #[arg(long)]
    pub quiet: bool,
}

impl OptionArgs {
    /// Overlay the config file (if any) and these flags onto defaults.
    pub fn resolve(&self, config: Option<&Path>) -> Result<ProcessOptions, CliError> {
        let mut options = ProcessOptions::default();
        if let Some(path) = config {
            options = cloudtiler::config::load(path, options)?;
        }
        if let Some(v) = self.cell_size {
            options = options.with_cell_size(v);
        }
        if let Some(v) = self.buffer {
            options = options.with_buffer(v);
        }
        if let Some(v) = self.resolution {
            options = options.with_resolution(v);
        }
        if let Some(v) = self.workers {
            options = options.with_workers(v);
        }
        if self.quiet {
            options = options.with_progress(false);
        }
        Ok(options)
    }
}

/// Single-line console progress bar on stderr.
pub struct ConsoleProgress {
    state: Mutex<()>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(()),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent) {
        let _lock = self.state.lock().unwrap();
        let mut err = std::io::stderr();
        match &event {
            ProgressEvent::RunStarted { total_tiles, workers } => {
                let _ = writeln!(err, "Processing {} tiles on {} workers", total_tiles, workers);
            }
            ProgressEvent::TileCompleted { completed, total, .. } => {
                let pct = event.percent().unwrap_or(0.0);
                let _ = write!(err, "\r  {}/{} tiles ({:.0}%)", completed, total, pct);
                if completed == total {
                    let _ = writeln!(err);
                }
            }
            ProgressEvent::TileFailed { index, message, .. } => {
                let _ = writeln!(err, "\n  tile {} failed: {}", index, message);
            }
            ProgressEvent::RunCompleted { total, failed } => {
                if *failed > 0 {
                    let _ = writeln!(err, "Done: {} tiles, {} failed", total, failed);
                }
            }
        }
    }
}
