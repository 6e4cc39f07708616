//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and a
//! handler:
//!
//! - [`info`] - Catalog summary (extent, area, per-file boxes)
//! - [`tiles`] - Tile layout preview
//! - [`run`] - Full aggregation run
//!
//! [`common`] holds the shared pieces: the synthetic demo catalog, the
//! flag-to-options mapping and the console progress bar.

pub mod common;
pub mod info;
pub mod run;
pub mod tiles;
