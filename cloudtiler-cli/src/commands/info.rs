//! `info` command: catalog summary.

use std::path::Path;

use clap::Args;

use super::common::CatalogArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Also list every file's bounding box
    #[arg(long)]
    pub files: bool,
}

pub fn handle(args: &InfoArgs, _config: Option<&Path>) -> Result<(), CliError> {
    let reader = args.catalog.build_reader()?;
    let catalog = reader.catalog().map_err(|e| CliError::Catalog(e.to_string()))?;

    println!("Catalog summary");
    println!("  files:        {}", catalog.len());
    println!("  points:       {}", catalog.total_points());
    println!("  extent:       {}", catalog.extent());
    println!("  area:         {:.0} square units", catalog.area());
    println!(
        "  density:      {:.3} points per square unit",
        catalog.total_points() as f64 / catalog.area()
    );

    if args.files {
        println!();
        println!("Files");
        for entry in catalog.entries() {
            println!(
                "  {}  {}  ({} points)",
                entry.source.display(),
                entry.bbox,
                entry.point_count
            );
        }
    }
    Ok(())
}
