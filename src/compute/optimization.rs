//! Run entry point: candidate preparation, engine setup and result decoding.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;

use crate::schema::{
    CandidateFilterConfig, CandidateSite, CandidateSpace, EvolutionSummary, GenerationStats,
    Individual, OptimizationParams, ParamsError, Region,
};

use super::dedup::dedupe;
use super::evolution::{
    CoverageEvaluator, CoverageScoring, EvolutionEngine, EvolutionResult, ProgressCallback,
};
use super::population::PopulationOracle;

/// Input validation failures. Raised before any generation runs.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptimizationError {
    #[error("No candidate sites left after filtering")]
    EmptyCandidateSet,
    #[error("Maximum container count must be positive")]
    NoContainers,
    #[error("Requested {requested} containers but only {available} candidates are available")]
    TooManyContainers { requested: usize, available: usize },
    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ParamsError),
    #[error("Evolution produced no evaluated individual")]
    NoResult,
}

/// Optional observers for a run.
#[derive(Default)]
pub struct RunHooks {
    /// Called after every generation.
    pub progress: Option<ProgressCallback>,
    /// Cooperative cancellation, observed between generations.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// The recommended placement and how the run got there.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    /// Hall-of-fame individual over the prepared candidate pool.
    pub best: Individual,
    /// (longitude, latitude) of the chosen sites, in candidate order.
    pub coordinates: Vec<(f64, f64)>,
    /// The chosen sites.
    pub sites: Vec<CandidateSite>,
    /// Population of each Voronoi cell of the chosen sites (0 where lookup failed).
    pub cell_populations: Vec<f64>,
    /// Statistics per generation, starting with the initial population.
    pub stats: Vec<GenerationStats>,
    pub summary: EvolutionSummary,
    /// Candidates the genome indexed into.
    pub candidate_pool: Vec<CandidateSite>,
    /// Population after the last generation.
    #[serde(skip)]
    pub final_population: Vec<Individual>,
}

/// Keep candidates whose tag is allowed, then drop near-duplicates.
pub fn prepare_candidates(
    candidates: &[CandidateSite],
    filter: &CandidateFilterConfig,
) -> Vec<CandidateSite> {
    let tagged = candidates
        .iter()
        .filter(|site| filter.tags.is_empty() || filter.tags.contains(&site.tag));

    let kept: Vec<CandidateSite> = dedupe(tagged, filter.dedup_threshold_m)
        .into_iter()
        .cloned()
        .collect();

    log::info!(
        "Prepared {} of {} candidate sites",
        kept.len(),
        candidates.len()
    );
    kept
}

/// Run the search with default hooks.
pub fn run_optimization<O: PopulationOracle>(
    space: &CandidateSpace,
    region: &Region,
    oracle: O,
    params: &OptimizationParams,
) -> Result<OptimizationResult, OptimizationError> {
    run_optimization_with_hooks(space, region, oracle, params, RunHooks::default())
}

/// Validate inputs, prepare candidates, evolve and decode the best placement.
pub fn run_optimization_with_hooks<O: PopulationOracle>(
    space: &CandidateSpace,
    region: &Region,
    oracle: O,
    params: &OptimizationParams,
    hooks: RunHooks,
) -> Result<OptimizationResult, OptimizationError> {
    params.validate()?;

    let candidates = prepare_candidates(&space.candidates, &params.candidates);
    if candidates.is_empty() {
        return Err(OptimizationError::EmptyCandidateSet);
    }

    let max_containers = params
        .fitness
        .max_containers
        .unwrap_or(space.deployed.len());
    if max_containers == 0 {
        return Err(OptimizationError::NoContainers);
    }
    if max_containers > candidates.len() {
        return Err(OptimizationError::TooManyContainers {
            requested: max_containers,
            available: candidates.len(),
        });
    }

    let scoring = CoverageScoring {
        service_level: params.fitness.service_level,
        infeasible_penalty: params.fitness.infeasible_penalty,
        max_containers,
    };
    let evaluator = CoverageEvaluator::new(region.clone(), candidates, oracle, scoring);

    let genome_len = evaluator.candidates().len();
    let mut engine = EvolutionEngine::new(params, genome_len, max_containers, evaluator);
    if let Some(cancel) = hooks.cancel {
        engine = engine.with_cancel_handle(cancel);
    }

    let EvolutionResult {
        population,
        hall_of_fame,
        history,
        summary,
    } = match &hooks.progress {
        Some(callback) => engine.run_with_callback(|p| callback(p)),
        None => engine.run(),
    };

    let best = hall_of_fame.ok_or(OptimizationError::NoResult)?;
    let evaluator = engine.evaluator();
    let candidate_pool = evaluator.candidates().to_vec();

    let sites: Vec<CandidateSite> = best
        .genome
        .active_indices()
        .filter_map(|i| candidate_pool.get(i).cloned())
        .collect();
    let coordinates = best.genome.decode(&candidate_pool);
    let cell_populations = evaluator
        .cell_coverage(&best.genome)
        .iter()
        .map(|c| c.population.unwrap_or(0.0))
        .collect();

    Ok(OptimizationResult {
        best,
        coordinates,
        sites,
        cell_populations,
        stats: history,
        summary,
        candidate_pool,
        final_population: population,
    })
}
