//! Catalog spatial index.
//!
//! A [`Catalog`] is the full collection of source point-cloud files treated
//! as one logical dataset. It holds one [`CatalogEntry`] per source file
//! (identifier plus bounding box) and the derived total extent.
//!
//! The catalog is loaded once before a run and is read-only afterwards, so
//! it can be shared across worker threads behind an `Arc` without locking.

mod entry;
mod index;

pub use entry::CatalogEntry;
pub use index::{Catalog, CatalogError};
