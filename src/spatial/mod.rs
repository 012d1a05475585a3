//! Spatial partitioning: the collision grid and the row bands the worker pool
//! splits it into.

pub mod bands;
pub mod grid;

pub use bands::{partition_rows, Band};
pub use grid::{CellGrid, GridDims, FORWARD_STENCIL, MAX_CELLS};
