//! Selection and variation operators.
//!
//! The engine holds one boxed instance of each trait and calls it directly.
//! Variation operators report whether they changed the genome so unchanged
//! individuals keep their score.

use crate::schema::{Genome, Individual};

use super::genome::GenomeRng;

/// Builds a mating pool from an evaluated population.
pub trait SelectionOperator: Send + Sync {
    fn select(&self, population: &[Individual], count: usize, rng: &mut GenomeRng)
    -> Vec<Individual>;
}

/// Recombines two genomes in place. Returns whether either genome changed.
pub trait CrossoverOperator: Send + Sync {
    fn mate(&self, a: &mut Genome, b: &mut Genome, rng: &mut GenomeRng) -> bool;
}

/// Perturbs a genome in place. Returns whether it changed.
pub trait MutationOperator: Send + Sync {
    fn mutate(&self, genome: &mut Genome, rng: &mut GenomeRng) -> bool;
}

/// Tournament selection: each pick is the lowest-scoring of `size` uniform
/// draws with replacement.
#[derive(Debug, Clone, Copy)]
pub struct Tournament {
    pub size: usize,
}

impl SelectionOperator for Tournament {
    fn select(
        &self,
        population: &[Individual],
        count: usize,
        rng: &mut GenomeRng,
    ) -> Vec<Individual> {
        if population.is_empty() {
            return Vec::new();
        }

        (0..count)
            .map(|_| {
                let mut best_idx = rng.index(population.len());
                for _ in 1..self.size.max(1) {
                    let idx = rng.index(population.len());
                    if population[idx].rank_score() < population[best_idx].rank_score() {
                        best_idx = idx;
                    }
                }
                population[best_idx].clone()
            })
            .collect()
    }
}

/// Uniform crossover: each position is swapped with probability `indpb`.
#[derive(Debug, Clone, Copy)]
pub struct UniformCrossover {
    pub indpb: f64,
}

impl CrossoverOperator for UniformCrossover {
    fn mate(&self, a: &mut Genome, b: &mut Genome, rng: &mut GenomeRng) -> bool {
        let mut changed = false;
        for (x, y) in a.bits.iter_mut().zip(b.bits.iter_mut()) {
            if rng.chance(self.indpb) {
                changed |= *x != *y;
                std::mem::swap(x, y);
            }
        }
        changed
    }
}

/// Bit-flip mutation: each position flips with probability `indpb`.
#[derive(Debug, Clone, Copy)]
pub struct FlipBitMutation {
    pub indpb: f64,
}

impl MutationOperator for FlipBitMutation {
    fn mutate(&self, genome: &mut Genome, rng: &mut GenomeRng) -> bool {
        let mut changed = false;
        for bit in &mut genome.bits {
            if rng.chance(self.indpb) {
                *bit = !*bit;
                changed = true;
            }
        }
        changed
    }
}
