//! Benchmarks for coverage fitness evaluation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use site_planner::{
    compute::{
        UniformDensity,
        evolution::{CoverageEvaluator, CoverageScoring, Evaluator, GenomeRng},
        voronoi_division,
    },
    schema::{CandidateSite, Region},
};

/// Candidates on a jittered grid inside the unit square.
fn grid_candidates(count: usize) -> Vec<CandidateSite> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            let jitter = (i % 7) as f64 * 0.01;
            CandidateSite {
                id: format!("c{}", i),
                coordinate: (
                    (col as f64 + 0.5 + jitter) / side as f64,
                    (row as f64 + 0.5 - jitter) / side as f64,
                ),
                tag: "Gray".into(),
            }
        })
        .collect()
}

fn bench_coverage_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("coverage_evaluation");

    let region = Region::rectangle((0.0, 0.0), (1.0, 1.0)).unwrap();
    for sites in [5, 10, 25, 50] {
        let candidates = grid_candidates(sites * 4);
        let evaluator = CoverageEvaluator::new(
            region.clone(),
            candidates,
            UniformDensity {
                per_unit_area: 10_000.0,
            },
            CoverageScoring {
                service_level: 200.0,
                infeasible_penalty: 1e6,
                max_containers: sites,
            },
        );
        let genome = GenomeRng::new(42).random_individual(sites * 4, sites);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_sites", sites)),
            &sites,
            |b, _| {
                b.iter(|| evaluator.evaluate(black_box(&genome)));
            },
        );
    }

    group.finish();
}

fn bench_voronoi_division(c: &mut Criterion) {
    let mut group = c.benchmark_group("voronoi_division");

    let region = Region::new(vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 0.6),
        (0.5, 0.4),
        (0.5, 1.0),
        (0.0, 1.0),
    ])
    .unwrap();
    for sites in [10, 50, 100] {
        let points: Vec<(f64, f64)> = grid_candidates(sites)
            .into_iter()
            .map(|site| site.coordinate)
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(sites), &sites, |b, _| {
            b.iter(|| voronoi_division(black_box(&points), &region));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_coverage_evaluation, bench_voronoi_division);
criterion_main!(benches);
