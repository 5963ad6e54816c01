//! Genome construction utilities for evolutionary search.

use rand::prelude::*;
use rand::seq::index;

use crate::schema::Genome;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Genome of length `size` with exactly `ones_count` bits set, chosen
    /// uniformly without replacement. `ones_count` saturates at `size`.
    pub fn random_individual(&mut self, size: usize, ones_count: usize) -> Genome {
        let mut genome = Genome::empty(size);
        for i in index::sample(&mut self.rng, size, ones_count.min(size)).iter() {
            genome.bits[i] = true;
        }
        genome
    }

    /// True with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform index in `0..len`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_random_individual() {
        let mut rng = GenomeRng::new(42);
        let genome = rng.random_individual(100, 17);
        assert_eq!(genome.len(), 100);
        assert_eq!(genome.ones(), 17);
    }

    #[test]
    fn test_same_seed_same_genome() {
        let a = GenomeRng::new(7).random_individual(50, 5);
        let b = GenomeRng::new(7).random_individual(50, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ones_count_saturates() {
        let mut rng = GenomeRng::new(1);
        assert_eq!(rng.random_individual(4, 9).ones(), 4);
        assert!(rng.random_individual(0, 0).is_empty());
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = GenomeRng::new(3);
        assert!((0..100).all(|_| rng.chance(1.0)));
        assert!((0..100).all(|_| !rng.chance(0.0)));
    }

    proptest! {
        #[test]
        fn prop_exact_cardinality(seed in any::<u64>(), size in 1usize..300, frac in 0.0f64..=1.0) {
            let ones = (size as f64 * frac) as usize;
            let genome = GenomeRng::new(seed).random_individual(size, ones);
            prop_assert_eq!(genome.len(), size);
            prop_assert_eq!(genome.ones(), ones);
        }
    }
}
