//! Schema module - Run parameters, scenario data and result types.

mod evolution;
mod scenario;

pub use evolution::*;
pub use scenario::*;
