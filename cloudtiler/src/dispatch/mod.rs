//! Bounded worker pool with ordered fan-in.
//!
//! The dispatcher owns a pool of worker threads fed from a shared work
//! queue. Each tile is one independent unit of work; results travel back
//! tagged with their tile index and are reassembled in submission order
//! before the merge step, no matter how execution interleaved.
//!
//! A tile failure does not cancel in-flight siblings: every tile settles,
//! progress keeps flowing, and the run as a whole then reports which
//! tiles failed. Panics inside the user function are caught per tile and
//! reported as that tile's failure.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use thiserror::Error;
use tracing::debug;

use crate::partition::Tile;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::worker::{TileResult, TileWorker, WorkerError};

/// Processes one tile; the seam between the pool and the worker logic.
///
/// [`TileWorker`] is the production implementation; tests substitute
/// mocks to exercise pool behavior in isolation.
pub trait TileProcessor: Send + Sync {
    /// Produce the tile's result.
    fn process(&self, tile: &Tile) -> Result<TileResult, WorkerError>;
}

impl TileProcessor for TileWorker {
    fn process(&self, tile: &Tile) -> Result<TileResult, WorkerError> {
        TileWorker::process(self, tile)
    }
}

/// One failed tile in an otherwise settled run.
#[derive(Debug, Clone)]
pub struct TileFailure {
    /// Submission index of the failed tile.
    pub index: usize,
    /// Stable tile name.
    pub name: String,
    /// Failure description (error or panic payload).
    pub message: String,
}

/// Errors surfaced by a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// At least one tile failed; every tile settled first
    #[error("{} of {total} tiles failed: {}", .failures.len(), failed_names(.failures))]
    TilesFailed {
        failures: Vec<TileFailure>,
        total: usize,
    },

    /// The pool lost a worker or a channel unexpectedly
    #[error("dispatch internal error: {0}")]
    Internal(String),
}

/// Bounded local worker pool.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    /// Requested pool size; `0` means all available cores. Always capped
    /// to the number of tiles at run time.
    pub workers: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self { workers: 0 }
    }
}

impl Dispatcher {
    /// Create a dispatcher with an explicit worker count.
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Effective pool size for a given tile count.
    pub fn pool_size(&self, tiles: usize) -> usize {
        let requested = if self.workers == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            self.workers
        };
        requested.min(tiles).max(1)
    }

    /// Run every tile through the processor, returning results in
    /// submission order.
    pub fn run(
        &self,
        tiles: Vec<Tile>,
        processor: Arc<dyn TileProcessor>,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<TileResult>, DispatchError> {
        let total = tiles.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let pool = self.pool_size(total);

        progress.emit(ProgressEvent::RunStarted {
            total_tiles: total,
            workers: pool,
        });
        debug!(tiles = total, workers = pool, "dispatching tiles");

        let names: Vec<String> = tiles.iter().map(|t| t.name.clone()).collect();

        let (work_tx, work_rx) = mpsc::channel::<(usize, Tile)>();
        for (index, tile) in tiles.into_iter().enumerate() {
            work_tx
                .send((index, tile))
                .map_err(|e| DispatchError::Internal(e.to_string()))?;
        }
        drop(work_tx);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let (result_tx, result_rx) = mpsc::channel::<(usize, Result<TileResult, String>)>();

        let mut slots: Vec<Option<TileResult>> = (0..total).map(|_| None).collect();
        let mut failures: Vec<TileFailure> = Vec::new();

        thread::scope(|scope| {
            for i in 0..pool {
                let work_rx = Arc::clone(&work_rx);
                let result_tx = result_tx.clone();
                let processor = Arc::clone(&processor);
                thread::Builder::new()
                    .name(format!("tile-worker-{}", i))
                    .spawn_scoped(scope, move || {
                        Self::worker_loop(work_rx, result_tx, processor);
                    })
                    .expect("failed to spawn tile worker thread");
            }
            drop(result_tx);

            // Collect as tiles settle; completion order is arbitrary but
            // the completed count only grows.
            let mut completed = 0;
            for (index, outcome) in result_rx.iter() {
                completed += 1;
                match outcome {
                    Ok(result) => {
                        progress.emit(ProgressEvent::TileCompleted {
                            index,
                            completed,
                            total,
                        });
                        slots[index] = Some(result);
                    }
                    Err(message) => {
                        progress.emit(ProgressEvent::TileFailed {
                            index,
                            completed,
                            total,
                            message: message.clone(),
                        });
                        failures.push(TileFailure {
                            index,
                            name: names[index].clone(),
                            message,
                        });
                    }
                }
            }
        });

        progress.emit(ProgressEvent::RunCompleted {
            total,
            failed: failures.len(),
        });

        if !failures.is_empty() {
            failures.sort_by_key(|f| f.index);
            return Err(DispatchError::TilesFailed { failures, total });
        }

        let mut results = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(result) => results.push(result),
                None => {
                    return Err(DispatchError::Internal(format!(
                        "tile {} produced no result",
                        index
                    )))
                }
            }
        }
        Ok(results)
    }

    /// Worker thread loop: drain the queue until it closes.
    fn worker_loop(
        work_rx: Arc<Mutex<Receiver<(usize, Tile)>>>,
        result_tx: Sender<(usize, Result<TileResult, String>)>,
        processor: Arc<dyn TileProcessor>,
    ) {
        loop {
            let work = {
                let receiver = work_rx.lock().expect("work queue lock poisoned");
                receiver.recv()
            };
            let Ok((index, tile)) = work else {
                break;
            };

            let outcome = match catch_unwind(AssertUnwindSafe(|| processor.process(&tile))) {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(err)) => Err(err.to_string()),
                Err(payload) => Err(panic_message(payload)),
            };

            if result_tx.send((index, outcome)).is_err() {
                // Collector went away; nothing left to do.
                break;
            }
        }
    }
}

/// Comma-separated failed-tile names for error display.
fn failed_names(failures: &[TileFailure]) -> String {
    failures
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}
