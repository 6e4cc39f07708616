//! `tiles` command: tile layout preview.

use std::path::Path;
use std::sync::Arc;

use clap::Args;

use cloudtiler::process::CatalogProcessor;

use super::common::{CatalogArgs, OptionArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct TilesArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub options: OptionArgs,
}

pub fn handle(args: &TilesArgs, config: Option<&Path>) -> Result<(), CliError> {
    let reader = args.catalog.build_reader()?;
    let catalog = reader.catalog().map_err(|e| CliError::Catalog(e.to_string()))?;
    let options = args.options.resolve(config)?;

    let processor = CatalogProcessor::new(catalog, Arc::new(reader), options);
    let tiles = processor.tiles()?;

    println!("{} tiles (buffer applied per side)", tiles.len());
    for tile in &tiles {
        println!(
            "  {:>6}  core {}  buffered {}",
            tile.name, tile.core, tile.buffered
        );
    }
    Ok(())
}
