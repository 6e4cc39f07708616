//! Catalog partitioning.
//!
//! Turns the catalog extent into an ordered set of [`Tile`]s, each owning a
//! non-overlapping core region plus a buffered read region. The grid is
//! phase-aligned to a global origin so repeated runs over different
//! sub-extents share cell edges, and an optional [`OccupancyMask`] prunes
//! tiles covering empty ground before any work is dispatched.
//!
//! [`OccupancyMask`]: crate::mask::OccupancyMask

mod grid;
mod tile;

pub use grid::{make_tiles, PartitionError};
pub use tile::{CellSizeSpec, Tile};
