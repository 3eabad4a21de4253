//! Profiling tool to identify performance bottlenecks

use std::time::Instant;

use landslide_sim::{
    body, params::SimulationConfig, rng::SlopeRng, rng::PARTICLE_SEED_OFFSET, terrain::Terrain,
    EnvironmentParams, Simulation, SlideKind,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seed = 1337u64;
    let config = SimulationConfig::default();
    let env = EnvironmentParams {
        cohesion: 4.0,
        moisture: 0.6,
        ..Default::default()
    };

    println!("=== Performance Profiling ===");
    println!("Canvas: {}x{}, {} terrain points", config.width, config.height, config.terrain_points);
    println!();

    // Profile terrain generation
    let start = Instant::now();
    let terrain = Terrain::generate(&config, env.slope_angle, &mut SlopeRng::new(seed))?;
    let terrain_time = start.elapsed();
    println!("Terrain generation: {:?}", terrain_time);

    // Profile population
    let start = Instant::now();
    let bodies = body::populate(
        &terrain,
        &config,
        env.vegetation,
        &mut SlopeRng::offset(seed, PARTICLE_SEED_OFFSET),
    );
    let populate_time = start.elapsed();
    println!("Population: {:?} ({} bodies)", populate_time, bodies.len());

    // Profile slide + settling
    let mut sim = Simulation::new(config, env, seed)?;
    let start = Instant::now();
    let report = sim.trigger_landslide(SlideKind::Manual);
    let trigger_time = start.elapsed();
    println!("Trigger: {:?}", trigger_time);
    if let Some(report) = report {
        println!("  Affected: {} particles, {} trees", report.affected_particles, report.toppled_trees);
    }

    let start = Instant::now();
    let mut ticks = 0usize;
    while sim.has_residual_activity() && ticks < 20_000 {
        sim.tick(1.0 / 60.0);
        ticks += 1;
    }
    let tick_time = start.elapsed();
    println!("Settling: {:?} over {} ticks", tick_time, ticks);
    if ticks > 0 {
        println!("  Per tick: {:?}", tick_time / ticks as u32);
    }
    println!("  Fallen: {}", sim.fallen_count());

    // Summary
    let total = terrain_time + populate_time + trigger_time + tick_time;
    println!("\n=== Summary ===");
    println!("Terrain:    {:>8.2}% ({:?})", 100.0 * terrain_time.as_secs_f64() / total.as_secs_f64(), terrain_time);
    println!("Population: {:>8.2}% ({:?})", 100.0 * populate_time.as_secs_f64() / total.as_secs_f64(), populate_time);
    println!("Trigger:    {:>8.2}% ({:?})", 100.0 * trigger_time.as_secs_f64() / total.as_secs_f64(), trigger_time);
    println!("Ticks:      {:>8.2}% ({:?})", 100.0 * tick_time.as_secs_f64() / total.as_secs_f64(), tick_time);

    Ok(())
}
