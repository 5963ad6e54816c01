//! Site Planner - Evolutionary facility location over Voronoi coverage.
//!
//! Given a service region, the currently deployed sites and a pool of tagged
//! candidate locations, this crate searches for a fixed-size subset of
//! candidates whose Voronoi partition of the region best matches a
//! per-site population service level.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Run parameters, scenario data (region, sites) and result types
//! - `compute`: Geometry, spatial deduplication, population lookups and the
//!   evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use site_planner::{
//!     compute::{UniformDensity, run_optimization},
//!     schema::{CandidateSite, CandidateSpace, OptimizationParams, Region},
//! };
//!
//! let region = Region::rectangle((0.0, 0.0), (1.0, 1.0)).unwrap();
//! let space = CandidateSpace {
//!     deployed: Vec::new(),
//!     candidates: vec![
//!         CandidateSite { id: "a".into(), coordinate: (0.2, 0.3), tag: "Gray".into() },
//!         CandidateSite { id: "b".into(), coordinate: (0.7, 0.6), tag: "Gray".into() },
//!         CandidateSite { id: "c".into(), coordinate: (0.4, 0.9), tag: "Gray".into() },
//!     ],
//! };
//!
//! let mut params = OptimizationParams::default();
//! params.fitness.max_containers = Some(2);
//!
//! let oracle = UniformDensity { per_unit_area: 5000.0 };
//! let result = run_optimization(&space, &region, oracle, &params).unwrap();
//!
//! println!("Best fitness: {}", result.summary.best_fitness);
//! for (lon, lat) in &result.coordinates {
//!     println!("  site at ({lon:.5}, {lat:.5})");
//! }
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{OptimizationError, OptimizationResult, run_optimization};
pub use schema::{CandidateSite, CandidateSpace, OptimizationParams, Region, Scenario};
