//! Run progress observability.
//!
//! The dispatcher emits structured events through a sink abstraction and
//! does not know how they are consumed: logging, a console bar, or
//! nothing. Progress is advisory: completion events may arrive out of
//! tile order, but the completed count is monotonically increasing.

use std::sync::Arc;

use tracing::{info, warn};

/// Events emitted while a run executes.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Dispatch started.
    RunStarted {
        total_tiles: usize,
        workers: usize,
    },

    /// One tile finished successfully (or was empty).
    ///
    /// `completed` counts every settled tile so far and only grows.
    TileCompleted {
        index: usize,
        completed: usize,
        total: usize,
    },

    /// One tile failed; the run continues until all tiles settle.
    TileFailed {
        index: usize,
        completed: usize,
        total: usize,
        message: String,
    },

    /// All tiles settled.
    RunCompleted {
        total: usize,
        failed: usize,
    },
}

impl ProgressEvent {
    /// Completed percentage for display, when the event carries one.
    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressEvent::TileCompleted { completed, total, .. }
            | ProgressEvent::TileFailed { completed, total, .. } => {
                Some(100.0 * *completed as f64 / (*total).max(1) as f64)
            }
            _ => None,
        }
    }
}

/// Consumes progress events.
pub trait ProgressSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that forwards events to `tracing`.
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::RunStarted { total_tiles, workers } => {
                info!(total_tiles, workers, "run started");
            }
            ProgressEvent::TileCompleted { index, completed, total } => {
                info!(index, completed, total, "tile completed");
            }
            ProgressEvent::TileFailed { index, message, .. } => {
                warn!(index, message = %message, "tile failed");
            }
            ProgressEvent::RunCompleted { total, failed } => {
                info!(total, failed, "run completed");
            }
        }
    }
}

/// Pick the sink for a run: the caller's when progress is on, else null.
pub fn sink_for(progress: bool, sink: Arc<dyn ProgressSink>) -> Arc<dyn ProgressSink> {
    if progress {
        sink
    } else {
        Arc::new(NullProgressSink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records events for assertions.
    pub struct RecordingSink {
        pub events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_percent() {
        let event = ProgressEvent::TileCompleted {
            index: 0,
            completed: 1,
            total: 4,
        };
        assert_eq!(event.percent(), Some(25.0));

        let event = ProgressEvent::RunStarted {
            total_tiles: 4,
            workers: 2,
        };
        assert_eq!(event.percent(), None);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        NullProgressSink.emit(ProgressEvent::RunCompleted { total: 0, failed: 0 });
    }

    #[test]
    fn test_sink_for_disabled_progress() {
        let recording = Arc::new(RecordingSink::new());
        let sink = sink_for(false, recording.clone());
        sink.emit(ProgressEvent::RunCompleted { total: 1, failed: 0 });
        assert!(recording.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sink_for_enabled_progress() {
        let recording = Arc::new(RecordingSink::new());
        let sink = sink_for(true, recording.clone());
        sink.emit(ProgressEvent::RunCompleted { total: 1, failed: 0 });
        assert_eq!(recording.events.lock().unwrap().len(), 1);
    }
}
