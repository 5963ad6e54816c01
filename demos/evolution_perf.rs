//! Quick evolution performance test

use site_planner::{
    compute::{UniformDensity, run_optimization},
    schema::{
        CandidateSite, CandidateSpace, FitnessConfig, OptimizationParams, PopulationConfig, Region,
    },
};
use std::time::Instant;

/// Candidates scattered over a small city block around Valencia.
fn candidate_space(count: usize) -> CandidateSpace {
    let side = (count as f64).sqrt().ceil() as usize;
    let candidates = (0..count)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            let jitter = (i % 5) as f64 * 0.0002;
            CandidateSite {
                id: format!("urn:container:{}", i),
                coordinate: (
                    -0.40 + 0.05 * (col as f64 + 0.5) / side as f64 + jitter,
                    39.45 + 0.04 * (row as f64 + 0.5) / side as f64 - jitter,
                ),
                tag: "Gray".into(),
            }
        })
        .collect();

    CandidateSpace {
        deployed: Vec::new(),
        candidates,
    }
}

fn main() {
    println!("=== Evolution Performance Test ===\n");

    let region = match Region::rectangle((-0.40, 39.45), (-0.35, 39.49)) {
        Ok(region) => region,
        Err(e) => {
            eprintln!("Invalid region: {}", e);
            return;
        }
    };
    let density = UniformDensity::with_total(&region, 50_000.0);

    // Test different candidate pool sizes
    for pool in [40, 100, 200] {
        println!("Candidates: {}", pool);

        let params = OptimizationParams {
            population: PopulationConfig {
                size: 40,
                generations: 10,
            },
            fitness: FitnessConfig {
                max_containers: Some(pool / 4),
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let result = match run_optimization(&candidate_space(pool), &region, density, &params) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("  Run failed: {}", e);
                continue;
            }
        };
        let elapsed = start.elapsed();

        let total_evals = result.summary.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.summary.generations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Best fitness:   {:.4}", result.summary.best_fitness);
        println!();
    }

    println!("=== Scalability Test (fixed 100 candidates) ===\n");

    // Test different population sizes
    for pop_size in [10, 20, 40, 80] {
        let params = OptimizationParams {
            population: PopulationConfig {
                size: pop_size,
                generations: 5,
            },
            fitness: FitnessConfig {
                max_containers: Some(25),
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let result = match run_optimization(&candidate_space(100), &region, density, &params) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Population {}: run failed: {}", pop_size, e);
                continue;
            }
        };
        let elapsed = start.elapsed();

        let total_evals = result.summary.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!(
            "Population {}: {} evals in {:.2}s ({:.1} evals/sec)",
            pop_size,
            total_evals,
            elapsed.as_secs_f64(),
            evals_per_sec
        );
    }
}
