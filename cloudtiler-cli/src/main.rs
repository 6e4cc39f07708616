//! CloudTiler CLI - Command-line interface
//!
//! This binary exposes the cloudtiler engine for inspection and demo
//! runs: catalog summaries, tile layout previews, and full aggregation
//! runs over a synthetic catalog (real deployments plug a point-cloud
//! reader backend into the library instead).

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cloudtiler::logging::{default_log_dir, default_log_file, init_logging};

use commands::{info, run, tiles};
use error::CliError;

#[derive(Parser)]
#[command(name = "cloudtiler")]
#[command(version = cloudtiler::VERSION)]
#[command(about = "Tile, process and merge point-cloud catalogs", long_about = None)]
struct Cli {
    /// Optional INI config file with run defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip log file setup (log to stdout only via RUST_LOG)
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of the catalog: extent, area, per-file boxes
    Info(info::InfoArgs),
    /// Print the tile layout a run would use, without running anything
    Tiles(tiles::TilesArgs),
    /// Run an aggregation across the catalog
    Run(run::RunArgs),
}

fn main() {
    let cli = Cli::parse();

    let _guard = if cli.no_log_file {
        None
    } else {
        match init_logging(default_log_dir(), default_log_file()) {
            Ok(guard) => Some(guard),
            Err(e) => CliError::LoggingInit(e.to_string()).exit(),
        }
    };

    let result = match &cli.command {
        Commands::Info(args) => info::handle(args, cli.config.as_deref()),
        Commands::Tiles(args) => tiles::handle(args, cli.config.as_deref()),
        Commands::Run(args) => run::handle(args, cli.config.as_deref()),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults_parse() {
        let cli = Cli::try_parse_from(["cloudtiler", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_tiles_with_flags_parse() {
        let cli = Cli::try_parse_from([
            "cloudtiler",
            "tiles",
            "--grid",
            "2",
            "--cell-size",
            "500",
            "--buffer",
            "25",
        ])
        .unwrap();
        let Commands::Tiles(args) = cli.command else {
            panic!("expected tiles subcommand");
        };
        assert_eq!(args.catalog.grid, 2);
        assert_eq!(args.options.cell_size, Some(500.0));
    }
}
