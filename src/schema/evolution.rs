//! Evolution configuration types for site-placement search.
//!
//! Every hyperparameter of a run lives here so a run is fully described by
//! one [`OptimizationParams`] value plus its [`super::Scenario`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CandidateSite, ScenarioError};

/// Top-level configuration for one optimization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationParams {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Variation and selection settings.
    #[serde(default)]
    pub genetic: GeneticAlgorithmConfig,
    /// Scoring settings.
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// Candidate pre-filtering settings.
    #[serde(default)]
    pub candidates: CandidateFilterConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl OptimizationParams {
    /// Load parameters from a JSON file. Missing sections take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations to run.
    #[serde(default = "default_generations")]
    pub generations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            generations: default_generations(),
        }
    }
}

fn default_population_size() -> usize {
    700
}
fn default_generations() -> usize {
    330
}

/// Genetic algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Probability that a consecutive pair is mated.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability that an offspring is mutated.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Per-gene swap probability used by uniform crossover.
    #[serde(default = "default_crossover_indpb")]
    pub crossover_indpb: f64,
    /// Per-gene flip probability used by bit-flip mutation.
    #[serde(default = "default_mutation_indpb")]
    pub mutation_indpb: f64,
    /// Number of draws per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Number of best individuals carried unchanged into the next generation.
    #[serde(default)]
    pub elitism: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            crossover_indpb: default_crossover_indpb(),
            mutation_indpb: default_mutation_indpb(),
            tournament_size: default_tournament_size(),
            elitism: 0,
        }
    }
}

fn default_crossover_rate() -> f64 {
    1.0
}
fn default_mutation_rate() -> f64 {
    0.26
}
fn default_crossover_indpb() -> f64 {
    0.7
}
fn default_mutation_indpb() -> f64 {
    0.05
}
fn default_tournament_size() -> usize {
    6
}

/// Coverage scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Population a cell serves before its excess starts counting.
    #[serde(default = "default_service_level")]
    pub service_level: f64,
    /// Score given to individuals with more active sites than allowed.
    #[serde(default = "default_infeasible_penalty")]
    pub infeasible_penalty: f64,
    /// Maximum number of active sites. Defaults to the deployed site count.
    #[serde(default)]
    pub max_containers: Option<usize>,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            service_level: default_service_level(),
            infeasible_penalty: default_infeasible_penalty(),
            max_containers: None,
        }
    }
}

fn default_service_level() -> f64 {
    1000.0
}
fn default_infeasible_penalty() -> f64 {
    900_000.0
}

/// Candidate pre-filtering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFilterConfig {
    /// Sites closer than this many meters are treated as duplicates.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold_m: f64,
    /// Tags a candidate may carry. Empty accepts every tag.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for CandidateFilterConfig {
    fn default() -> Self {
        Self {
            dedup_threshold_m: default_dedup_threshold(),
            tags: Vec::new(),
        }
    }
}

fn default_dedup_threshold() -> f64 {
    50.0
}

// ============================================================================
// Genome Types
// ============================================================================

/// Bit-vector genome: bit `i` set means candidate `i` is selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome {
    pub bits: Vec<bool>,
}

impl Genome {
    /// All-zero genome of the given length.
    pub fn empty(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of active sites.
    pub fn ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Indices of active sites, ascending.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
    }

    /// Coordinates of the active sites in candidate index order.
    pub fn decode(&self, candidates: &[CandidateSite]) -> Vec<(f64, f64)> {
        self.active_indices()
            .filter_map(|i| candidates.get(i))
            .map(|site| site.coordinate)
            .collect()
    }
}

/// Hamming distance between two genomes, normalized to [0, 1].
pub fn genome_distance(a: &Genome, b: &Genome) -> f64 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 0.0;
    }
    let differing = a
        .bits
        .iter()
        .zip(&b.bits)
        .filter(|(x, y)| x != y)
        .count()
        + a.len().abs_diff(b.len());
    differing as f64 / len as f64
}

/// A genome and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Genome,
    /// `None` until evaluated, and again after any operator changes the genome.
    pub fitness: Option<f64>,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Score used for ranking; unevaluated individuals rank last.
    pub fn rank_score(&self) -> f64 {
        self.fitness.unwrap_or(f64::INFINITY)
    }
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Fitness statistics for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number (0 is the initial population).
    pub generation: usize,
    /// Individuals evaluated during this generation.
    pub evaluations: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Mean pairwise Hamming distance.
    pub diversity: f64,
}

/// Current phase of the generational loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Population created, nothing scored yet.
    #[default]
    Initialized,
    /// Every individual carries a score.
    Evaluated,
    /// Building the mating pool.
    Selecting,
    /// Applying crossover and mutation.
    Varying,
    /// Loop finished.
    Terminated,
}

/// Progress update emitted after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best score seen so far.
    pub best_fitness: Option<f64>,
    /// Statistics of the generation just completed.
    pub stats: Option<GenerationStats>,
    /// Current phase of the algorithm.
    pub phase: EvolutionPhase,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSummary {
    /// Generations completed.
    pub generations: usize,
    /// Total evaluations performed.
    pub total_evaluations: u64,
    /// Best score achieved.
    pub best_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Ran the configured number of generations.
    MaxGenerations,
    /// Cancellation flag observed between generations.
    Cancelled,
}

// ============================================================================
// Validation
// ============================================================================

/// Parameter validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("Tournament size must be at least 1")]
    TournamentTooSmall,
    #[error("Elitism ({elitism}) must be smaller than the population size ({size})")]
    ElitismTooLarge { elitism: usize, size: usize },
    #[error("Probability {name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("{name} must be non-negative and finite, got {value}")]
    InvalidScore { name: &'static str, value: f64 },
    #[error("Dedup threshold must be positive, got {0}")]
    InvalidThreshold(f64),
}

impl OptimizationParams {
    /// Validate run parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.population.size < 1 {
            return Err(ParamsError::PopulationTooSmall);
        }

        let ga = &self.genetic;
        if ga.tournament_size < 1 {
            return Err(ParamsError::TournamentTooSmall);
        }
        if ga.elitism >= self.population.size {
            return Err(ParamsError::ElitismTooLarge {
                elitism: ga.elitism,
                size: self.population.size,
            });
        }

        let check_probability = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ParamsError::InvalidProbability { name, value })
            }
        };
        check_probability(ga.crossover_rate, "crossover_rate")?;
        check_probability(ga.mutation_rate, "mutation_rate")?;
        check_probability(ga.crossover_indpb, "crossover_indpb")?;
        check_probability(ga.mutation_indpb, "mutation_indpb")?;

        let check_score = |value: f64, name: &'static str| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ParamsError::InvalidScore { name, value })
            }
        };
        check_score(self.fitness.service_level, "service_level")?;
        check_score(self.fitness.infeasible_penalty, "infeasible_penalty")?;

        let threshold = self.candidates.dedup_threshold_m;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ParamsError::InvalidThreshold(threshold));
        }

        Ok(())
    }
}
