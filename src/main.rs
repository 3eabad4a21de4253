use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use landslide_sim::{RiskSnapshot, Scenario, Simulation, SlideKind, SlideReport};

#[derive(Parser, Debug)]
#[command(name = "landslide_sim")]
#[command(about = "Simulate rain-driven slope failure on a seeded particle slope")]
struct Args {
    /// Random seed (uses the current time if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Scenario file (JSON with "config" and "environment" sections)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of ticks to run
    #[arg(short, long, default_value = "3600")]
    ticks: usize,

    /// Wall-clock seconds per tick
    #[arg(long, default_value = "0.016666667")]
    dt: f64,

    /// Start with rain falling
    #[arg(long)]
    rain: bool,

    /// Fire a manual landslide before the first tick
    #[arg(long)]
    trigger: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    seed: u64,
    ticks_run: usize,
    risk: RiskSnapshot,
    manual_slide: Option<SlideReport>,
    slides: usize,
    fallen: usize,
    fos_trend: Vec<f64>,
    pof_trend: Vec<f64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let scenario = match &args.config {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };

    let mut sim = match args.seed {
        Some(seed) => Simulation::new(scenario.config, scenario.environment, seed)?,
        None => Simulation::from_wall_clock(scenario.config, scenario.environment)?,
    };

    if !args.json {
        println!("Simulating slope with seed: {}", sim.seed());
        println!(
            "Terrain: {} points, {} bodies",
            sim.terrain().len(),
            sim.bodies().len()
        );
    }

    sim.toggle_rain(args.rain);
    let manual_slide = if args.trigger { sim.trigger_landslide(SlideKind::Manual) } else { None };
    if let (Some(slide), false) = (&manual_slide, args.json) {
        println!(
            "Manual landslide at x={:.0}: {} particles, {} trees",
            slide.epicenter, slide.affected_particles, slide.toppled_trees
        );
    }

    let mut ticks_run = 0;
    while ticks_run < args.ticks {
        sim.tick(args.dt);
        ticks_run += 1;
        if !sim.is_raining() && !sim.has_residual_activity() {
            break;
        }
    }

    let risk = sim.risk_snapshot();
    if args.json {
        let (fos_trend, pof_trend) = sim.trend_history().series();
        let report = Report {
            seed: sim.seed(),
            ticks_run,
            risk,
            manual_slide,
            slides: sim.slide_count(),
            fallen: sim.fallen_count(),
            fos_trend,
            pof_trend,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nRan {} ticks", ticks_run);
    println!("Factor of safety: {:.3}", risk.fos);
    println!("Probability of failure: {:.2}%", 100.0 * risk.pof);
    println!("Pore-pressure ratio: {:.3}", risk.ru);
    println!("Effective cohesion: {:.1} kPa", risk.effective_cohesion);
    println!("Risk level: {} ({})", risk.level, risk.level.description());
    if let Some(rain) = risk.rain {
        println!(
            "Rain: {:.1} min simulated, {:.1} mm fallen, wetting front {:.1} mm",
            rain.simulated_minutes, rain.rainfall_mm, rain.infiltration_mm
        );
    }
    println!("Slides: {}", sim.slide_count());
    println!("Fallen particles: {}", sim.fallen_count());
    println!("Trend samples: {}", sim.trend_history().len());

    Ok(())
}
