//! Coverage fitness: Voronoi cells of the chosen sites scored against a
//! service level.
//!
//! Lower is better. Each cell adds `max(0, population - service_level)`; an
//! individual with more active sites than allowed gets a flat penalty instead.

use geo::MultiPolygon;

use crate::compute::geometry::voronoi_division;
use crate::compute::population::PopulationOracle;
use crate::schema::{CandidateSite, Genome, Region};

/// Scores a genome. Implementations must be pure so they can run in parallel.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, genome: &Genome) -> f64;
}

impl<F> Evaluator for F
where
    F: Fn(&Genome) -> f64 + Send + Sync,
{
    fn evaluate(&self, genome: &Genome) -> f64 {
        self(genome)
    }
}

/// Scoring constants for [`CoverageEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageScoring {
    /// Population a cell serves before its excess counts.
    pub service_level: f64,
    /// Score of an individual with too many active sites.
    pub infeasible_penalty: f64,
    /// Maximum number of active sites.
    pub max_containers: usize,
}

/// Population inside one clipped Voronoi cell.
#[derive(Debug, Clone)]
pub struct CellCoverage {
    pub cell: MultiPolygon<f64>,
    /// `None` when the lookup failed.
    pub population: Option<f64>,
}

/// Evaluates genomes over a fixed region and candidate pool.
pub struct CoverageEvaluator<O> {
    region: Region,
    candidates: Vec<CandidateSite>,
    oracle: O,
    scoring: CoverageScoring,
}

impl<O: PopulationOracle> CoverageEvaluator<O> {
    /// Create a new coverage evaluator.
    pub fn new(
        region: Region,
        candidates: Vec<CandidateSite>,
        oracle: O,
        scoring: CoverageScoring,
    ) -> Self {
        Self {
            region,
            candidates,
            oracle,
            scoring,
        }
    }

    pub fn scoring(&self) -> &CoverageScoring {
        &self.scoring
    }

    pub fn candidates(&self) -> &[CandidateSite] {
        &self.candidates
    }

    /// Whether the genome respects the active-site limit.
    pub fn is_feasible(&self, genome: &Genome) -> bool {
        genome.ones() <= self.scoring.max_containers
    }

    /// Voronoi cells of the genome's sites with their populations, in site
    /// order. Failed lookups are logged and reported as `None`.
    pub fn cell_coverage(&self, genome: &Genome) -> Vec<CellCoverage> {
        let points = genome.decode(&self.candidates);

        voronoi_division(&points, &self.region)
            .into_iter()
            .map(|cell| {
                let population = match self.oracle.population_in_polygon(&cell) {
                    Ok(p) if p.is_finite() => Some(p),
                    Ok(p) => {
                        log::warn!("Population lookup returned {}, counting 0", p);
                        None
                    }
                    Err(e) => {
                        log::warn!("Population lookup failed, counting 0: {}", e);
                        None
                    }
                };
                CellCoverage { cell, population }
            })
            .collect()
    }

    /// Coverage score ignoring the feasibility check.
    pub fn coverage_score(&self, genome: &Genome) -> f64 {
        let service_level = self.scoring.service_level;
        self.cell_coverage(genome)
            .iter()
            .map(|c| (c.population.unwrap_or(0.0) - service_level).max(0.0))
            .fold(0.0, |total, excess| total + excess)
    }
}

impl<O: PopulationOracle> Evaluator for CoverageEvaluator<O> {
    fn evaluate(&self, genome: &Genome) -> f64 {
        if !self.is_feasible(genome) {
            return self.scoring.infeasible_penalty;
        }
        self.coverage_score(genome)
    }
}
