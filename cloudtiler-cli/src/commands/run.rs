//! `run` command: full aggregation run.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use tracing::info;

use cloudtiler::aggregate::builtin::{HeightStats, PointDensity};
use cloudtiler::aggregate::{AggregateFn, ArgBag, ArgValue};
use cloudtiler::memory::{AbortPolicy, DecisionPolicy, GuardDecision, ProceedPolicy, SpillPolicy};
use cloudtiler::process::{CatalogProcessor, RunOutcome};
use cloudtiler::progress::NullProgressSink;

use super::common::{CatalogArgs, ConsoleProgress, OptionArgs};
use crate::error::CliError;

#[derive(Debug, Clone, ValueEnum)]
pub enum Metric {
    /// Points per square unit, per cell
    Density,
    /// Height summary per cell (mean/max/min of Z)
    Height,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OnMemoryWarning {
    /// Abort the run (default; safe for scripts)
    Abort,
    /// Proceed in memory anyway
    Proceed,
    /// Switch to spill-to-disk output
    Spill,
    /// Prompt on the terminal
    Ask,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub options: OptionArgs,

    /// Aggregation to run
    #[arg(long, value_enum, default_value = "density")]
    pub metric: Metric,

    /// Discard points below this height before height metrics
    #[arg(long)]
    pub zmin_floor: Option<f64>,

    /// Persist per-tile rasters instead of holding results in memory
    #[arg(long)]
    pub spill: bool,

    /// Directory for persisted tiles and the mosaic index
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Memory-warning threshold in bytes (0 disables the guard)
    #[arg(long)]
    pub memory_threshold: Option<u64>,

    /// What to do when the memory estimate exceeds the threshold
    #[arg(long, value_enum, default_value = "abort")]
    pub on_memory_warning: OnMemoryWarning,
}

/// Interactive policy: ask the operator on stderr/stdin.
struct PromptPolicy;

impl DecisionPolicy for PromptPolicy {
    fn decide(&self, estimate: u64, threshold: u64) -> GuardDecision {
        let mut err = std::io::stderr();
        let _ = writeln!(
            err,
            "Estimated output size {} bytes exceeds the {} byte threshold.",
            estimate, threshold
        );
        let _ = write!(err, "[p]roceed anyway, [s]pill to disk, or [a]bort? ");
        let _ = err.flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return GuardDecision::Abort;
        }
        match line.trim().to_lowercase().as_str() {
            "p" | "proceed" => GuardDecision::Proceed,
            "s" | "spill" => GuardDecision::ProceedSpilling,
            _ => GuardDecision::Abort,
        }
    }
}

pub fn handle(args: &RunArgs, config: Option<&Path>) -> Result<(), CliError> {
    let reader = args.catalog.build_reader()?;
    let catalog = reader.catalog().map_err(|e| CliError::Catalog(e.to_string()))?;

    let mut options = args.options.resolve(config)?;
    if args.spill {
        options = options.with_spill(true);
    }
    if let Some(dir) = &args.export_dir {
        options = options.with_export_dir(dir);
    }
    if let Some(threshold) = args.memory_threshold {
        options = options.with_memory_threshold(if threshold == 0 {
            None
        } else {
            Some(threshold)
        });
    }

    let func: Arc<dyn AggregateFn> = match args.metric {
        Metric::Density => Arc::new(PointDensity),
        Metric::Height => Arc::new(HeightStats),
    };
    let mut bag = ArgBag::new();
    if let Some(floor) = args.zmin_floor {
        bag = bag.with("zmin_floor", ArgValue::Float(floor));
    }

    let policy: Box<dyn DecisionPolicy> = match args.on_memory_warning {
        OnMemoryWarning::Abort => Box::new(AbortPolicy),
        OnMemoryWarning::Proceed => Box::new(ProceedPolicy),
        OnMemoryWarning::Spill => Box::new(SpillPolicy),
        OnMemoryWarning::Ask => Box::new(PromptPolicy),
    };

    let progress: Arc<dyn cloudtiler::progress::ProgressSink> = if options.progress {
        Arc::new(ConsoleProgress::new())
    } else {
        Arc::new(NullProgressSink)
    };

    let processor = CatalogProcessor::new(catalog, Arc::new(reader), options);
    info!(
        files = processor.catalog().len(),
        extent = %processor.catalog().extent(),
        "starting catalog run"
    );
    let outcome = processor.run(func, bag, policy.as_ref(), progress)?;

    match outcome {
        RunOutcome::Table(table) => {
            println!(
                "Merged table: {} rows, {} columns, resolution {}",
                table.n_rows(),
                table.columns().len(),
                table.resolution()
            );
            for name in &table.columns()[2..] {
                let values = table.column(name).unwrap_or_default();
                let (min, max) = values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &v| {
                    (acc.0.min(v), acc.1.max(v))
                });
                if !values.is_empty() {
                    println!("  {}: min {:.4}, max {:.4}", name, min, max);
                }
            }
        }
        RunOutcome::Mosaic(mosaic) => {
            println!(
                "Mosaic: {} tiles over {}, index {}",
                mosaic.len(),
                mosaic.extent,
                mosaic.vrt_path.display()
            );
        }
        RunOutcome::Aborted => {
            println!("Run aborted by memory guard; no output was produced.");
        }
    }
    Ok(())
}
