//! CloudTiler - Buffered tiling and parallel aggregation for point-cloud catalogs
//!
//! This library partitions a file-backed point-cloud collection into
//! spatially bounded, buffered tiles, runs a user-supplied per-tile
//! aggregation across them on a bounded worker pool, and merges the
//! per-tile results into one logical output: an in-memory table, or a
//! mosaic of persisted raster tiles when spilling to disk.
//!
//! # High-Level API
//!
//! Most callers only need the [`process`] facade:
//!
//! ```ignore
//! use std::sync::Arc;
//! use cloudtiler::aggregate::{builtin::PointDensity, ArgBag};
//! use cloudtiler::memory::AbortPolicy;
//! use cloudtiler::process::{CatalogProcessor, ProcessOptions};
//! use cloudtiler::progress::TracingProgressSink;
//!
//! let processor = CatalogProcessor::new(catalog, reader, ProcessOptions::default());
//! let outcome = processor.run(
//!     Arc::new(PointDensity),
//!     ArgBag::new(),
//!     &AbortPolicy,
//!     Arc::new(TracingProgressSink),
//! )?;
//! ```
//!
//! # Pipeline
//!
//! ```text
//! ┌───────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Spatial Index │──▶│ Partitioner │──▶│ Memory Guard │
//! │   (catalog)   │   │ (partition) │   │   (memory)   │
//! └───────────────┘   └─────────────┘   └──────┬───────┘
//!                                              │ go / spill / abort
//!                                              ▼
//! ┌───────────────┐   ┌─────────────┐   ┌──────────────┐
//! │    Merger     │◀──│ Tile Workers│◀──│  Dispatcher  │
//! │    (merge)    │   │  (worker)   │   │  (dispatch)  │
//! └───────────────┘   └─────────────┘   └──────────────┘
//! ```
//!
//! Point-cloud decoding ([`reader`]), the per-tile computation
//! ([`aggregate`]) and raster output ([`raster`]) are trait seams:
//! the engine orchestrates, collaborators do the format work.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod geom;
pub mod logging;
pub mod mask;
pub mod memory;
pub mod merge;
pub mod partition;
pub mod process;
pub mod progress;
pub mod raster;
pub mod reader;
pub mod table;
pub mod worker;

/// Version of the CloudTiler library and CLI.
///
/// Synchronized across all workspace components; defined in `Cargo.toml`
/// and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
