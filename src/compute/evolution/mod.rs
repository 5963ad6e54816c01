//! Evolutionary search module for choosing site subsets.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Genome construction** (`genome`): seeded RNG and exact-cardinality
//!   random genomes
//! - **Operators** (`operators`): tournament selection, uniform crossover,
//!   bit-flip mutation, each behind a trait so they can be swapped
//! - **Fitness** (`fitness`): Voronoi coverage scoring with a feasibility
//!   penalty
//! - **Search** (`search`): the generational loop with hall-of-fame and
//!   per-generation statistics
//!
//! # Example
//!
//! ```rust,no_run
//! use site_planner::compute::evolution::{
//!     CoverageEvaluator, CoverageScoring, EvolutionEngine,
//! };
//! use site_planner::compute::UniformDensity;
//! use site_planner::schema::{CandidateSite, OptimizationParams, Region};
//!
//! let region = Region::rectangle((0.0, 0.0), (1.0, 1.0)).unwrap();
//! let candidates: Vec<CandidateSite> = Vec::new();
//! let evaluator = CoverageEvaluator::new(
//!     region,
//!     candidates.clone(),
//!     UniformDensity { per_unit_area: 1000.0 },
//!     CoverageScoring { service_level: 100.0, infeasible_penalty: 9e5, max_containers: 3 },
//! );
//!
//! let params = OptimizationParams::default();
//! let mut engine = EvolutionEngine::new(&params, candidates.len(), 3, evaluator);
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:?}",
//!         progress.generation, progress.best_fitness);
//! });
//! println!("Best: {:?}", result.hall_of_fame);
//! ```

mod fitness;
mod genome;
mod operators;
mod search;

pub use fitness::{CellCoverage, CoverageEvaluator, CoverageScoring, Evaluator};
pub use genome::GenomeRng;
pub use operators::{
    CrossoverOperator, FlipBitMutation, MutationOperator, SelectionOperator, Tournament,
    UniformCrossover,
};
pub use search::{EvolutionEngine, EvolutionResult, ProgressCallback};
