//! Output-memory guard.
//!
//! Before any tile is dispatched, the engine estimates how large the merged
//! output would be if every cell of the catalog produced a metric row, and
//! applies a policy decision: proceed in memory, spill per-tile rasters to
//! disk, or abort the run. The estimate is a coarse heuristic (catalog area
//! over cell area times a per-cell byte cost), not precise accounting.
//!
//! The decision step is pluggable via [`DecisionPolicy`] so automated
//! contexts can run without prompts while a CLI can ask the operator.

use std::fmt;

/// Default warning threshold in bytes (~500 MB of merged output).
pub const DEFAULT_WARN_THRESHOLD: u64 = 500_000_000;

/// Default per-cell byte cost used by the estimate.
///
/// One f64 metric column per cell. An approximation: the real cost depends
/// on the user function's output schema, which is opaque to the engine.
pub const DEFAULT_BYTES_PER_CELL: f64 = 8.0;

/// Outcome of the guard's go/no-go check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Run with results held in memory.
    Proceed,
    /// Run, but persist per-tile rasters instead of accumulating tables.
    ProceedSpilling,
    /// Do not run. Surfaces as a distinguishable non-failure outcome.
    Abort,
}

impl fmt::Display for GuardDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardDecision::Proceed => write!(f, "proceed"),
            GuardDecision::ProceedSpilling => write!(f, "proceed (spilling to disk)"),
            GuardDecision::Abort => write!(f, "abort"),
        }
    }
}

/// Caller-supplied policy consulted when the estimate exceeds the
/// threshold and spilling was not already requested.
///
/// Implementations may prompt interactively or answer from configuration.
/// Closures with the matching signature implement the trait, so a test can
/// pass `|estimate, threshold| GuardDecision::Abort` directly.
pub trait DecisionPolicy {
    /// Choose what to do about an over-threshold estimate.
    fn decide(&self, estimate: u64, threshold: u64) -> GuardDecision;
}

impl<F> DecisionPolicy for F
where
    F: Fn(u64, u64) -> GuardDecision,
{
    fn decide(&self, estimate: u64, threshold: u64) -> GuardDecision {
        self(estimate, threshold)
    }
}

/// Non-interactive policy that always aborts.
///
/// The safe default for automated contexts: an unexpected memory blow-up
/// stops the run instead of silently thrashing the host.
pub struct AbortPolicy;

impl DecisionPolicy for AbortPolicy {
    fn decide(&self, _estimate: u64, _threshold: u64) -> GuardDecision {
        GuardDecision::Abort
    }
}

/// Non-interactive policy that always proceeds in memory.
pub struct ProceedPolicy;

impl DecisionPolicy for ProceedPolicy {
    fn decide(&self, _estimate: u64, _threshold: u64) -> GuardDecision {
        GuardDecision::Proceed
    }
}

/// Non-interactive policy that switches the run to spill mode.
pub struct SpillPolicy;

impl DecisionPolicy for SpillPolicy {
    fn decide(&self, _estimate: u64, _threshold: u64) -> GuardDecision {
        GuardDecision::ProceedSpilling
    }
}

/// Estimates merged-output size and applies the spill/abort policy.
#[derive(Debug, Clone)]
pub struct MemoryGuard {
    /// Byte threshold above which the policy is consulted. `None`
    /// disables the guard entirely.
    pub warn_threshold: Option<u64>,
    /// Estimated bytes per output cell.
    pub bytes_per_cell: f64,
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self {
            warn_threshold: Some(DEFAULT_WARN_THRESHOLD),
            bytes_per_cell: DEFAULT_BYTES_PER_CELL,
        }
    }
}

impl MemoryGuard {
    /// Create a guard with an explicit threshold (`None` = disabled).
    pub fn new(warn_threshold: Option<u64>) -> Self {
        Self {
            warn_threshold,
            ..Self::default()
        }
    }

    /// Estimate the merged-output size in bytes.
    ///
    /// `catalog_area` is the extent's width × height; `cell_size` is the
    /// output resolution handed to the user function.
    pub fn estimate(&self, catalog_area: f64, cell_size: f64) -> u64 {
        if cell_size <= 0.0 {
            return 0;
        }
        let cells = catalog_area / (cell_size * cell_size);
        (cells * self.bytes_per_cell).max(0.0) as u64
    }

    /// Apply the go/no-go policy to an estimate.
    ///
    /// Below the threshold (or with the guard disabled) the answer is
    /// always [`GuardDecision::Proceed`] and the policy is never
    /// consulted. Above it, a run already configured to spill proceeds
    /// silently in spill mode; otherwise the supplied policy chooses.
    pub fn decide(
        &self,
        estimate: u64,
        spill_requested: bool,
        policy: &dyn DecisionPolicy,
    ) -> GuardDecision {
        let Some(threshold) = self.warn_threshold else {
            return GuardDecision::Proceed;
        };
        if estimate <= threshold {
            return GuardDecision::Proceed;
        }
        if spill_requested {
            return GuardDecision::ProceedSpilling;
        }
        policy.decide(estimate, threshold)
    }
}
