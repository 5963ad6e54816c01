//! Compute module - Geometry, candidate filtering and evolutionary search.

mod dedup;
mod geometry;
mod optimization;
mod population;

pub mod evolution;

pub use dedup::*;
pub use geometry::*;
pub use optimization::*;
pub use population::*;
