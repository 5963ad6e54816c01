//! Site Planner CLI - Run a placement search from JSON files.

use std::path::PathBuf;
use std::process;

use serde::Serialize;

use site_planner::{
    compute::{PopulationRaster, RunHooks, UniformDensity, run_optimization_with_hooks},
    schema::{
        CandidateSite, CandidateSource, CandidateSpace, EvolutionProgress, JsonCandidateSource,
        OptimizationParams, Region, Scenario,
    },
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_files();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.json> [params.json] [raster.json]", args[0]);
        eprintln!();
        eprintln!("Choose candidate sites that best cover a region's population.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  scenario.json  Region, deployed sites and candidate sites");
        eprintln!("  params.json    Run parameters (default: built-in defaults)");
        eprintln!("  raster.json    Population raster (default: uniform density)");
        eprintln!();
        eprintln!("Example files are printed with the --example flag.");
        process::exit(1);
    }

    let source = JsonCandidateSource::new(PathBuf::from(&args[1]));
    let mut scenario = source.load().unwrap_or_else(|e| {
        eprintln!("Error loading scenario: {}", e);
        process::exit(1);
    });

    let params = match args.get(2) {
        Some(path) => OptimizationParams::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading parameters: {}", e);
            process::exit(1);
        }),
        None => OptimizationParams::default(),
    };

    let removed = scenario.retain_within_region();
    if removed > 0 {
        log::info!("Dropped {} candidates outside the region", removed);
    }

    println!("Site Planner");
    println!("============");
    println!("Region area: {:.6}", scenario.region.area());
    println!("Deployed sites: {}", scenario.space.deployed.len());
    println!("Candidate sites: {}", scenario.space.candidates.len());
    println!(
        "Population: {} x {} generations",
        params.population.size, params.population.generations
    );
    println!();

    let hooks = RunHooks {
        progress: Some(Box::new(print_progress)),
        cancel: None,
    };

    let result = match args.get(3) {
        Some(path) => {
            let raster = PopulationRaster::from_json_file(path).unwrap_or_else(|e| {
                eprintln!("Error loading raster: {}", e);
                process::exit(1);
            });
            run_optimization_with_hooks(
                &scenario.space,
                &scenario.region,
                raster,
                &params,
                hooks,
            )
        }
        None => {
            let sites = params
                .fitness
                .max_containers
                .unwrap_or(scenario.space.deployed.len());
            let density = UniformDensity::for_service_level(
                &scenario.region,
                params.fitness.service_level,
                sites,
            );
            log::warn!(
                "No population raster given, spreading {:.0} people uniformly",
                density.per_unit_area * scenario.region.area()
            );
            run_optimization_with_hooks(
                &scenario.space,
                &scenario.region,
                density,
                &params,
                hooks,
            )
        }
    };

    let result = result.unwrap_or_else(|e| {
        eprintln!("Optimization failed: {}", e);
        process::exit(1);
    });

    println!();
    println!(
        "Finished: {} generations, {} evaluations in {:.2}s ({:?})",
        result.summary.generations,
        result.summary.total_evaluations,
        result.summary.elapsed_seconds,
        result.summary.stop_reason
    );
    println!("Best fitness: {:.3}", result.summary.best_fitness);
    println!();

    print_json(&result);
}

fn print_progress(progress: &EvolutionProgress) {
    if let Some(stats) = progress.stats {
        println!(
            "  Gen {}/{}: min={:.3}, avg={:.3}, max={:.3}, evals={}",
            progress.generation,
            progress.total_generations,
            stats.min,
            stats.avg,
            stats.max,
            stats.evaluations
        );
    }
}

fn print_example_files() {
    let site = |id: &str, coordinate, tag: &str| CandidateSite {
        id: id.into(),
        coordinate,
        tag: tag.into(),
    };

    let region = match Region::rectangle((-0.40, 39.45), (-0.35, 39.49)) {
        Ok(region) => region,
        Err(e) => {
            eprintln!("Error building example region: {}", e);
            process::exit(1);
        }
    };
    let scenario = Scenario {
        region,
        space: CandidateSpace {
            deployed: vec![site("urn:container:1", (-0.380, 39.470), "Orange")],
            candidates: vec![
                site("urn:container:2", (-0.390, 39.460), "Gray"),
                site("urn:container:3", (-0.370, 39.475), "Yellow"),
                site("urn:container:4", (-0.360, 39.480), "Blue"),
            ],
        },
    };

    let mut params = OptimizationParams::default();
    params.population.size = 50;
    params.population.generations = 20;
    params.random_seed = Some(42);

    println!("Example scenario (scenario.json):");
    print_json(&scenario);
    println!();
    println!("Example parameters (params.json):");
    print_json(&params);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            process::exit(1);
        }
    }
}
