//! Generational search over bit-vector genomes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::schema::{
    EvolutionPhase, EvolutionProgress, EvolutionSummary, GeneticAlgorithmConfig, GenerationStats,
    Individual, OptimizationParams, StopReason,
};

use super::fitness::Evaluator;
use super::genome::GenomeRng;
use super::operators::{
    CrossoverOperator, FlipBitMutation, MutationOperator, SelectionOperator, Tournament,
    UniformCrossover,
};

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&EvolutionProgress) + Send + Sync>;

/// Everything a finished run produces.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Population after the last generation.
    pub population: Vec<Individual>,
    /// Best individual seen during the run.
    pub hall_of_fame: Option<Individual>,
    /// Statistics per generation, starting with the initial population.
    pub history: Vec<GenerationStats>,
    pub summary: EvolutionSummary,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<E> {
    population_size: usize,
    generations: usize,
    genome_len: usize,
    ones_count: usize,
    ga: GeneticAlgorithmConfig,
    rng: GenomeRng,
    evaluator: E,
    selection: Box<dyn SelectionOperator>,
    crossover: Box<dyn CrossoverOperator>,
    mutation: Box<dyn MutationOperator>,
    population: Vec<Individual>,
    hall_of_fame: Option<Individual>,
    history: Vec<GenerationStats>,
    generation: usize,
    total_evaluations: u64,
    phase: EvolutionPhase,
    cancelled: Arc<AtomicBool>,
}

impl<E: Evaluator> EvolutionEngine<E> {
    /// Create a new evolution engine for genomes of `genome_len` bits, each
    /// starting with `ones_count` active sites.
    ///
    /// Operators default to tournament selection, uniform crossover and
    /// bit-flip mutation configured from `params.genetic`.
    pub fn new(
        params: &OptimizationParams,
        genome_len: usize,
        ones_count: usize,
        evaluator: E,
    ) -> Self {
        let seed = params.random_seed.unwrap_or_else(rand::random);
        let ga = params.genetic.clone();

        Self {
            population_size: params.population.size,
            generations: params.population.generations,
            genome_len,
            ones_count,
            rng: GenomeRng::new(seed),
            evaluator,
            selection: Box::new(Tournament {
                size: ga.tournament_size,
            }),
            crossover: Box::new(UniformCrossover {
                indpb: ga.crossover_indpb,
            }),
            mutation: Box::new(FlipBitMutation {
                indpb: ga.mutation_indpb,
            }),
            ga,
            population: Vec::new(),
            hall_of_fame: None,
            history: Vec::new(),
            generation: 0,
            total_evaluations: 0,
            phase: EvolutionPhase::Initialized,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the selection operator.
    pub fn with_selection(mut self, selection: impl SelectionOperator + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    /// Replace the crossover operator.
    pub fn with_crossover(mut self, crossover: impl CrossoverOperator + 'static) -> Self {
        self.crossover = Box::new(crossover);
        self
    }

    /// Replace the mutation operator.
    pub fn with_mutation(mut self, mutation: impl MutationOperator + 'static) -> Self {
        self.mutation = Box::new(mutation);
        self
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel_handle(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Get cancellation handle. Checked only between generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn hall_of_fame(&self) -> Option<&Individual> {
        self.hall_of_fame.as_ref()
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Initialize the population.
    pub fn initialize(&mut self) {
        self.population = (0..self.population_size)
            .map(|_| {
                Individual::new(
                    self.rng
                        .random_individual(self.genome_len, self.ones_count),
                )
            })
            .collect();
        self.hall_of_fame = None;
        self.history.clear();
        self.generation = 0;
        self.total_evaluations = 0;
        self.phase = EvolutionPhase::Initialized;
    }

    /// Score every unevaluated individual, then update the hall-of-fame and
    /// statistics. Returns the number of evaluations performed.
    pub fn evaluate_population(&mut self) -> usize {
        let evaluator = &self.evaluator;

        // Parallel evaluation; returns once every individual is scored.
        let evaluations = self
            .population
            .par_iter_mut()
            .filter(|ind| !ind.is_evaluated())
            .map(|ind| ind.fitness = Some(evaluator.evaluate(&ind.genome)))
            .count();

        self.total_evaluations += evaluations as u64;
        self.update_hall_of_fame();
        self.record_stats(evaluations);
        self.phase = EvolutionPhase::Evaluated;

        evaluations
    }

    /// Replace the hall-of-fame with a copy of the best individual if it is
    /// strictly better.
    fn update_hall_of_fame(&mut self) {
        let Some(best) = self
            .population
            .iter()
            .filter(|ind| ind.is_evaluated())
            .min_by(|a, b| a.rank_score().total_cmp(&b.rank_score()))
        else {
            return;
        };

        let improves = self
            .hall_of_fame
            .as_ref()
            .is_none_or(|hof| best.rank_score() < hof.rank_score());
        if improves {
            self.hall_of_fame = Some(best.clone());
        }
    }

    fn record_stats(&mut self, evaluations: usize) {
        let scores: Vec<f64> = self.population.iter().filter_map(|c| c.fitness).collect();
        if scores.is_empty() {
            return;
        }

        let n = scores.len() as f64;
        let avg = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;

        let stats = GenerationStats {
            generation: self.generation,
            evaluations,
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg,
            std: variance.sqrt(),
            diversity: self.compute_diversity(),
        };

        log::debug!(
            "gen {:>4} nevals {:>5} avg {:.3} std {:.3} min {:.3} max {:.3}",
            stats.generation,
            stats.evaluations,
            stats.avg,
            stats.std,
            stats.min,
            stats.max
        );

        self.history.push(stats);
    }

    /// Mean pairwise Hamming distance. A position holding `c` ones differs
    /// in `c * (n - c)` of the pairs.
    fn compute_diversity(&self) -> f64 {
        let n = self.population.len();
        if n < 2 || self.genome_len == 0 {
            return 0.0;
        }

        let mut ones = vec![0usize; self.genome_len];
        for ind in &self.population {
            for (count, &bit) in ones.iter_mut().zip(&ind.genome.bits) {
                *count += bit as usize;
            }
        }

        let differing: f64 = ones.iter().map(|&c| (c * (n - c)) as f64).sum();
        let pairs = (n * (n - 1) / 2) as f64;
        differing / pairs / self.genome_len as f64
    }

    /// Build the mating pool.
    fn select(&mut self) -> Vec<Individual> {
        self.phase = EvolutionPhase::Selecting;
        self.selection
            .select(&self.population, self.population_size, &mut self.rng)
    }

    /// Mate consecutive pairs, then mutate. Changed offspring lose their score.
    fn vary(&mut self, offspring: &mut [Individual]) {
        self.phase = EvolutionPhase::Varying;

        for pair in offspring.chunks_exact_mut(2) {
            if self.rng.chance(self.ga.crossover_rate) {
                let (left, right) = pair.split_at_mut(1);
                let (a, b) = (&mut left[0], &mut right[0]);
                if self.crossover.mate(&mut a.genome, &mut b.genome, &mut self.rng) {
                    a.fitness = None;
                    b.fitness = None;
                }
            }
        }

        for ind in offspring.iter_mut() {
            if self.rng.chance(self.ga.mutation_rate)
                && self.mutation.mutate(&mut ind.genome, &mut self.rng)
            {
                ind.fitness = None;
            }
        }
    }

    /// Best `ga.elitism` individuals of the current population.
    fn elites(&self) -> Vec<Individual> {
        let mut ranked: Vec<&Individual> = self.population.iter().collect();
        ranked.sort_by(|a, b| a.rank_score().total_cmp(&b.rank_score()));
        ranked
            .into_iter()
            .take(self.ga.elitism)
            .cloned()
            .collect()
    }

    /// Run a single generation step: select, vary, evaluate.
    pub fn step_generation(&mut self) {
        let elites = self.elites();

        let mut offspring = self.select();
        self.vary(&mut offspring);

        for (slot, elite) in offspring.iter_mut().zip(elites) {
            *slot = elite;
        }

        self.population = offspring;
        self.generation += 1;
        self.evaluate_population();
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.generations,
            best_fitness: self.hall_of_fame.as_ref().and_then(|h| h.fitness),
            stats: self.history.last().copied(),
            phase: self.phase,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation >= self.generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> EvolutionResult
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();

        log::info!(
            "Starting evolution: {} individuals x {} generations over {} candidates",
            self.population_size,
            self.generations,
            self.genome_len
        );

        self.initialize();
        self.evaluate_population();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation();
            callback(&self.progress());
        };

        self.phase = EvolutionPhase::Terminated;

        let elapsed = start_time.elapsed().as_secs_f64();
        let best_fitness = self
            .hall_of_fame
            .as_ref()
            .map(Individual::rank_score)
            .unwrap_or(f64::INFINITY);

        log::info!(
            "Evolution finished after {} generations ({:?}), best fitness {:.3}",
            self.generation,
            stop_reason,
            best_fitness
        );

        EvolutionResult {
            population: self.population.clone(),
            hall_of_fame: self.hall_of_fame.clone(),
            history: self.history.clone(),
            summary: EvolutionSummary {
                generations: self.generation,
                total_evaluations: self.total_evaluations,
                best_fitness,
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.total_evaluations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}
