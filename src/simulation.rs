//! Simulation state and the tick driver
//!
//! `Simulation` owns every piece of mutable state: terrain, bodies, effects,
//! the rain clock and the trend buffer. A caller advances it with [`Simulation::tick`]
//! and feeds it parameter changes and slide requests between ticks. Nothing
//! here blocks or spawns threads.

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::body::{populate, Body, SlopeForcing};
use crate::effects::{DebrisCloud, DebrisPile, Effects, Raindrop};
use crate::error::SimError;
use crate::geotech::{assess, RainClock, RiskSnapshot};
use crate::history::TrendHistory;
use crate::params::{Bounds, EnvironmentParams, SimulationConfig};
use crate::rng::{SlopeRng, PARTICLE_SEED_OFFSET};
use crate::terrain::{Terrain, TerrainPoint};
use crate::trigger::{fire, SlideContext, SlideKind, SlideReport};

/// Longest wall-clock step a single tick accepts (seconds).
pub const MAX_TICK_DT: f64 = 0.25;
/// Trend samples store FoS capped at this value.
const TREND_FOS_CAP: f64 = 10.0;
/// Rain intensity (mm/hr) per raindrop spawn attempt.
const RAIN_PER_ATTEMPT: f64 = 10.0;
/// Draw that must be exceeded for a spawn attempt to produce a drop.
const RAINDROP_CHANCE: f64 = 0.75;

/// Read-only view of everything a renderer needs for one frame.
#[derive(Debug, Serialize)]
pub struct Frame<'a> {
    pub terrain: &'a [TerrainPoint],
    pub bodies: &'a [Body],
    pub clouds: &'a [DebrisCloud],
    pub piles: &'a [DebrisPile],
    pub raindrops: &'a [Raindrop],
    pub risk: RiskSnapshot,
    pub fallen_count: usize,
    pub has_residual_activity: bool,
}

/// Freshly generated world for one seed.
struct World {
    terrain: Terrain,
    bodies: Vec<Body>,
    rng: SlopeRng,
    weather: ChaCha8Rng,
}

impl World {
    fn generate(config: &SimulationConfig, env: &EnvironmentParams, seed: u64) -> Result<Self, SimError> {
        let mut rng = SlopeRng::new(seed);
        let terrain = Terrain::generate(config, env.slope_angle, &mut rng)?;

        let mut rng = SlopeRng::offset(seed, PARTICLE_SEED_OFFSET);
        let bodies = populate(&terrain, config, env.vegetation, &mut rng);

        Ok(Self { terrain, bodies, rng, weather: ChaCha8Rng::seed_from_u64(seed) })
    }
}

/// Full landslide simulation.
pub struct Simulation {
    config: SimulationConfig,
    bounds: Bounds,
    env: EnvironmentParams,
    seed: u64,
    rng: SlopeRng,
    /// Weather stream for raindrop placement
    weather: ChaCha8Rng,
    terrain: Terrain,
    bodies: Vec<Body>,
    effects: Effects,
    trend: TrendHistory,
    rain: RainClock,
    risk: RiskSnapshot,
    sliding_active: bool,
    /// One-shot guard, cleared only by regeneration or reset
    auto_triggered: bool,
    /// Seconds left before a scheduled automatic slide
    pending_auto: Option<f64>,
    slide_count: usize,
}

impl Simulation {
    /// Build a simulation from a configuration, an environment and a seed.
    pub fn new(config: SimulationConfig, env: EnvironmentParams, seed: u64) -> Result<Self, SimError> {
        config.validate()?;
        let env = env.sanitized();
        let world = World::generate(&config, &env, seed)?;
        let rain = RainClock::new(config.time_acceleration);

        let mut sim = Self {
            bounds: Bounds::from(&config),
            trend: TrendHistory::with_capacity(config.trend_capacity),
            risk: assess(&env, &rain),
            config,
            env,
            seed,
            rng: world.rng,
            weather: world.weather,
            terrain: world.terrain,
            bodies: world.bodies,
            effects: Effects::new(),
            rain,
            sliding_active: false,
            auto_triggered: false,
            pending_auto: None,
            slide_count: 0,
        };
        log::info!(
            "generated terrain (seed {}): {} points, {} bodies",
            seed,
            sim.terrain.len(),
            sim.bodies.len()
        );
        sim.update_risk();
        Ok(sim)
    }

    /// Build a simulation seeded from the current time.
    pub fn from_wall_clock(config: SimulationConfig, env: EnvironmentParams) -> Result<Self, SimError> {
        Self::new(config, env, wall_clock_seed())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn environment(&self) -> &EnvironmentParams {
        &self.env
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn rain_clock(&self) -> &RainClock {
        &self.rain
    }

    pub fn is_sliding(&self) -> bool {
        self.sliding_active
    }

    pub fn is_raining(&self) -> bool {
        self.rain.active
    }

    /// Slides fired since the last regeneration.
    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    /// Regenerate terrain and bodies, with a fresh wall-clock seed when `seed`
    /// is `None`. On error the current state is kept.
    ///
    /// Clears effects, the trend buffer, the slide state and the rain clock,
    /// but leaves rain on if it was on.
    pub fn generate_terrain(&mut self, seed: Option<u64>) -> Result<(), SimError> {
        let seed = seed.unwrap_or_else(wall_clock_seed);
        let world = match World::generate(&self.config, &self.env, seed) {
            Ok(world) => world,
            Err(e) => {
                log::warn!("terrain regeneration rejected: {}", e);
                return Err(e);
            }
        };

        self.seed = seed;
        self.terrain = world.terrain;
        self.bodies = world.bodies;
        self.rng = world.rng;
        self.weather = world.weather;
        self.effects.clear();
        self.trend.clear();
        self.rain.reset();
        self.sliding_active = false;
        self.auto_triggered = false;
        self.pending_auto = None;
        self.slide_count = 0;

        log::info!(
            "generated terrain (seed {}): {} points, {} bodies",
            seed,
            self.terrain.len(),
            self.bodies.len()
        );
        self.update_risk();
        Ok(())
    }

    /// Swap in a new configuration and regenerate with the current seed.
    /// An invalid configuration is rejected and nothing changes.
    pub fn reconfigure(&mut self, config: SimulationConfig) -> Result<(), SimError> {
        if let Err(e) = config.validate() {
            log::warn!("configuration rejected: {}", e);
            return Err(e);
        }
        let trend = TrendHistory::with_capacity(config.trend_capacity);
        let previous_config = std::mem::replace(&mut self.config, config);
        let previous_trend = std::mem::replace(&mut self.trend, trend);
        if let Err(e) = self.generate_terrain(Some(self.seed)) {
            self.config = previous_config;
            self.trend = previous_trend;
            return Err(e);
        }
        self.bounds = Bounds::from(&self.config);
        self.rain.acceleration = self.config.time_acceleration;
        Ok(())
    }

    /// Apply new environmental inputs.
    ///
    /// A new slope angle regenerates the terrain with the current seed. A new
    /// vegetation cover repopulates the slope, even mid-slide. The risk is
    /// re-evaluated only outside a slide.
    pub fn set_environment(&mut self, params: EnvironmentParams) -> Result<(), SimError> {
        let params = params.sanitized();
        let slope_changed = params.slope_angle != self.env.slope_angle;
        let vegetation_changed = params.vegetation != self.env.vegetation;
        self.env = params;

        if slope_changed {
            return self.generate_terrain(Some(self.seed));
        }
        if vegetation_changed {
            self.bodies = populate(&self.terrain, &self.config, self.env.vegetation, &mut self.rng);
        }
        if !self.sliding_active {
            self.update_risk();
        }
        Ok(())
    }

    /// Start or stop the rain.
    pub fn toggle_rain(&mut self, on: bool) {
        if self.rain.active != on {
            log::debug!("rain {}", if on { "started" } else { "stopped" });
        }
        self.rain.active = on;
    }

    /// Start a slide now. Returns `None` while another slide is running.
    pub fn trigger_landslide(&mut self, kind: SlideKind) -> Option<SlideReport> {
        if self.sliding_active {
            return None;
        }
        self.sliding_active = true;
        self.risk = assess(&self.env, &self.rain);

        let report = fire(
            kind,
            SlideContext {
                terrain: &mut self.terrain,
                bodies: &mut self.bodies,
                effects: &mut self.effects,
                rng: &mut self.rng,
                risk: &self.risk,
                slope_angle: self.env.slope_angle,
            },
        );
        self.slide_count += 1;
        Some(report)
    }

    /// Restore the default environment, stop the rain and regenerate with a
    /// wall-clock seed.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.reset_with_seed(wall_clock_seed())
    }

    pub fn reset_with_seed(&mut self, seed: u64) -> Result<(), SimError> {
        let previous = std::mem::take(&mut self.env);
        let was_raining = self.rain.active;
        self.rain.active = false;
        if let Err(e) = self.generate_terrain(Some(seed)) {
            self.env = previous;
            self.rain.active = was_raining;
            return Err(e);
        }
        Ok(())
    }

    /// Advance one frame by `dt` wall-clock seconds.
    pub fn tick(&mut self, dt: f64) -> Frame<'_> {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_TICK_DT) } else { 0.0 };
        self.rain.advance(dt);

        if self.rain.active {
            let attempts = (self.env.rain_intensity / RAIN_PER_ATTEMPT) as usize;
            for _ in 0..attempts {
                if self.rng.next_f64() > RAINDROP_CHANCE {
                    let drop = Raindrop::spawn(self.config.width, &mut self.weather);
                    self.effects.raindrops.push(drop);
                }
            }
        }

        let effects_busy = self.effects.is_active();
        self.effects.update(&self.terrain, &self.bounds);

        if let Some(remaining) = self.pending_auto.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.pending_auto = None;
                self.trigger_landslide(SlideKind::Automatic);
            }
        }

        let moving = self.bodies.iter().any(Body::is_moving);
        if moving || self.sliding_active {
            let forcing = SlopeForcing {
                vegetation: self.env.vegetation,
                erosion: self.env.erosion,
                ru: self.risk.ru,
            };
            for body in &mut self.bodies {
                match body {
                    Body::Grain(p) => {
                        p.update(&self.terrain, &forcing, &self.bounds, &mut self.rng, &mut self.effects)
                    }
                    Body::Tree(t) => t.update(),
                }
            }
            if self.sliding_active {
                self.terrain.relax_toward_original();
            }
            for body in &mut self.bodies {
                body.pin_to_surface(&self.terrain);
            }
        }

        if moving || self.rain.active || effects_busy {
            self.update_risk();
        }

        if self.sliding_active && self.terrain.is_relaxed() && self.bodies.iter().all(Body::is_settled) {
            self.sliding_active = false;
            log::info!("slide settled: {} grains lost", self.fallen_count());
        }

        self.frame()
    }

    /// Latest risk evaluation.
    pub fn risk_snapshot(&self) -> RiskSnapshot {
        self.risk
    }

    pub fn trend_history(&self) -> &TrendHistory {
        &self.trend
    }

    /// Grains that have left the canvas.
    pub fn fallen_count(&self) -> usize {
        self.bodies
            .iter()
            .filter_map(Body::as_grain)
            .filter(|p| p.fallen)
            .count()
    }

    /// Whether another tick would change anything. A driver may stop ticking
    /// while this is false and resume on the next input.
    pub fn has_residual_activity(&self) -> bool {
        self.sliding_active
            || self.rain.active
            || self.pending_auto.is_some()
            || self.effects.is_active()
            || self.bodies.iter().any(Body::is_moving)
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            terrain: self.terrain.points(),
            bodies: &self.bodies,
            clouds: &self.effects.clouds,
            piles: &self.effects.piles,
            raindrops: &self.effects.raindrops,
            risk: self.risk,
            fallen_count: self.fallen_count(),
            has_residual_activity: self.has_residual_activity(),
        }
    }

    /// Re-evaluate risk, record a trend sample and schedule the automatic
    /// slide the first time the risk is elevated.
    fn update_risk(&mut self) {
        self.risk = assess(&self.env, &self.rain);
        let fos = if self.risk.fos.is_finite() { self.risk.fos.min(TREND_FOS_CAP) } else { TREND_FOS_CAP };
        self.trend.push(fos, 100.0 * self.risk.pof);

        if !self.auto_triggered && !self.sliding_active && self.risk.is_elevated() {
            self.auto_triggered = true;
            self.pending_auto = Some(self.config.auto_trigger_delay);
            log::debug!(
                "risk elevated (FoS {:.3}, PoF {:.2}%), automatic slide in {:.1}s",
                self.risk.fos,
                100.0 * self.risk.pof,
                self.config.auto_trigger_delay
            );
        }
    }
}

fn wall_clock_seed() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotech::RiskLevel;

    const FRAME: f64 = 1.0 / 60.0;

    fn bare_slope() -> EnvironmentParams {
        EnvironmentParams { vegetation: 0.0, erosion: 0.0, moisture: 0.3, ..Default::default() }
    }

    fn weak_slope() -> EnvironmentParams {
        EnvironmentParams {
            cohesion: 2.0,
            friction_angle: 20.0,
            slope_angle: 40.0,
            moisture: 0.6,
            erosion: 0.5,
            ..Default::default()
        }
    }

    fn sim(env: EnvironmentParams, seed: u64) -> Simulation {
        Simulation::new(SimulationConfig::default(), env, seed).unwrap()
    }

    #[test]
    fn test_reference_scenario_end_to_end() {
        let s = sim(bare_slope(), 42);
        let risk = s.risk_snapshot();
        assert!((risk.ru - 0.3).abs() < 1e-12);
        assert!((risk.fos - 1.4665180306932613).abs() < 1e-6);
        assert!((risk.pof - 0.01697130313689038).abs() < 1e-6);
        assert_eq!(risk.level, RiskLevel::Caution);
        assert_eq!(s.trend_history().len(), 1);
        assert!(!s.has_residual_activity());
    }

    #[test]
    fn test_runs_are_reproducible() {
        let mut a = sim(EnvironmentParams::default(), 42);
        let mut b = sim(EnvironmentParams::default(), 42);
        let ra = a.trigger_landslide(SlideKind::Manual);
        let rb = b.trigger_landslide(SlideKind::Manual);
        assert_eq!(ra, rb);

        for _ in 0..100 {
            a.tick(FRAME);
            b.tick(FRAME);
        }
        assert_eq!(a.bodies(), b.bodies());
        assert_eq!(a.terrain(), b.terrain());
        assert_eq!(a.effects(), b.effects());
        assert_eq!(a.trend_history(), b.trend_history());
    }

    #[test]
    fn test_second_trigger_is_ignored_while_sliding() {
        let mut s = sim(weak_slope(), 5);
        assert!(s.trigger_landslide(SlideKind::Manual).is_some());
        assert!(s.is_sliding());
        assert!(s.trigger_landslide(SlideKind::Manual).is_none());
        assert_eq!(s.slide_count(), 1);
    }

    #[test]
    fn test_automatic_slide_fires_once_and_settles() {
        let mut s = sim(weak_slope(), 42);
        assert!(s.risk_snapshot().is_elevated());
        assert!(s.has_residual_activity());

        for _ in 0..7 {
            s.tick(0.1);
        }
        assert_eq!(s.slide_count(), 0);
        for _ in 0..3 {
            s.tick(0.1);
        }
        assert_eq!(s.slide_count(), 1);

        let mut ticks = 0;
        while s.has_residual_activity() {
            s.tick(FRAME);
            ticks += 1;
            assert!(ticks < 20_000, "slide never settled");
        }
        assert!(!s.is_sliding());
        assert!(s.fallen_count() > 0);
        assert!(s.terrain().is_relaxed());
        // Risk is still elevated, but the one-shot guard holds.
        assert!(s.risk_snapshot().is_elevated());
        assert_eq!(s.slide_count(), 1);
    }

    #[test]
    fn test_rain_raises_pore_ratio() {
        let mut s = sim(EnvironmentParams::default(), 3);
        let dry = s.risk_snapshot().ru;
        s.toggle_rain(true);
        for _ in 0..240 {
            s.tick(MAX_TICK_DT);
        }
        let wet = s.risk_snapshot();
        assert!(wet.ru > dry);
        assert!((s.rain_clock().elapsed - 60.0).abs() < 1e-9);
        assert!((wet.rain.unwrap().simulated_minutes - 300.0).abs() < 1e-6);
        assert!(s.has_residual_activity());

        s.toggle_rain(false);
        let before = s.rain_clock().elapsed;
        s.tick(MAX_TICK_DT);
        assert_eq!(s.rain_clock().elapsed, before);
    }

    #[test]
    fn test_tick_clamps_dt() {
        let mut s = sim(EnvironmentParams::default(), 3);
        s.toggle_rain(true);
        s.tick(10.0);
        assert_eq!(s.rain_clock().elapsed, MAX_TICK_DT);
        s.tick(f64::NAN);
        s.tick(-1.0);
        assert_eq!(s.rain_clock().elapsed, MAX_TICK_DT);
    }

    #[test]
    fn test_slope_change_regenerates() {
        let mut s = sim(EnvironmentParams::default(), 77);
        let original = s.terrain().clone();

        s.set_environment(EnvironmentParams { slope_angle: 35.0, ..Default::default() }).unwrap();
        assert_ne!(s.terrain(), &original);

        s.set_environment(EnvironmentParams::default()).unwrap();
        assert_eq!(s.terrain(), &original);
    }

    #[test]
    fn test_vegetation_change_repopulates() {
        let mut s = sim(EnvironmentParams::default(), 77);
        let trees = |s: &Simulation| s.bodies().iter().filter(|b| b.as_tree().is_some()).count();
        assert_eq!(trees(&s), 27);
        s.set_environment(EnvironmentParams { vegetation: 1.0, ..Default::default() }).unwrap();
        assert_eq!(trees(&s), 50);
        assert_eq!(s.trend_history().len(), 2);
    }

    #[test]
    fn test_vegetation_change_mid_slide_repopulates_without_sampling() {
        let mut s = sim(weak_slope(), 77);
        s.trigger_landslide(SlideKind::Manual);
        s.tick(FRAME);
        assert!(s.bodies().iter().any(Body::is_moving));
        let samples = s.trend_history().len();

        s.set_environment(EnvironmentParams { vegetation: 1.0, ..weak_slope() }).unwrap();
        assert_eq!(s.bodies().iter().filter(|b| b.as_tree().is_some()).count(), 50);
        assert!(!s.bodies().iter().any(Body::is_moving));
        assert_eq!(s.trend_history().len(), samples);

        // Fresh bodies are at rest, so the session winds down once the
        // terrain has relaxed.
        let mut ticks = 0;
        while s.is_sliding() {
            s.tick(FRAME);
            ticks += 1;
            assert!(ticks < 1000);
        }
    }

    #[test]
    fn test_no_second_automatic_slide_without_reset() {
        let mut s = sim(weak_slope(), 42);
        let mut ticks = 0;
        while s.slide_count() == 0 || s.has_residual_activity() {
            s.tick(0.1);
            ticks += 1;
            assert!(ticks < 20_000, "automatic slide never settled");
        }
        assert_eq!(s.slide_count(), 1);

        // Risk drops below the threshold on the same slope...
        s.set_environment(EnvironmentParams { cohesion: 40.0, ..weak_slope() }).unwrap();
        assert!(!s.risk_snapshot().is_elevated());
        assert_eq!(s.pending_auto, None);

        // ...and rises again. The one-shot guard holds until a reset.
        s.set_environment(weak_slope()).unwrap();
        assert!(s.risk_snapshot().is_elevated());
        assert_eq!(s.pending_auto, None);
        for _ in 0..20 {
            s.tick(0.1);
        }
        assert_eq!(s.slide_count(), 1);
        assert_eq!(s.pending_auto, None);
        assert!(!s.is_sliding());

        s.reset_with_seed(42).unwrap();
        s.set_environment(weak_slope()).unwrap();
        assert!(s.pending_auto.is_some());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut s = sim(weak_slope(), 9);
        s.toggle_rain(true);
        s.trigger_landslide(SlideKind::Manual);
        for _ in 0..20 {
            s.tick(FRAME);
        }

        s.reset_with_seed(9).unwrap();
        assert_eq!(s.environment(), &EnvironmentParams::default());
        assert!(!s.is_raining());
        assert!(!s.is_sliding());
        assert_eq!(s.slide_count(), 0);
        assert_eq!(s.fallen_count(), 0);
        assert_eq!(s.trend_history().len(), 1);
        assert!(s.effects().piles.is_empty());
        assert_eq!(s.rain_clock().elapsed, 0.0);
    }

    #[test]
    fn test_rejected_config_keeps_state() {
        let mut s = sim(EnvironmentParams::default(), 4);
        let terrain = s.terrain().clone();
        let bodies = s.bodies().len();

        let bad = SimulationConfig { terrain_points: 1, ..Default::default() };
        assert!(matches!(s.reconfigure(bad), Err(SimError::DegenerateTerrain { points: 1 })));
        assert_eq!(s.terrain(), &terrain);
        assert_eq!(s.bodies().len(), bodies);
        assert_eq!(s.config(), &SimulationConfig::default());

        assert!(Simulation::new(
            SimulationConfig { terrain_points: 0, ..Default::default() },
            EnvironmentParams::default(),
            4
        )
        .is_err());
    }

    #[test]
    fn test_frame_serializes() {
        let s = sim(EnvironmentParams::default(), 1);
        let json = serde_json::to_value(s.frame()).unwrap();
        assert_eq!(json["terrain"].as_array().unwrap().len(), 140);
        assert_eq!(json["fallen_count"], 0);
        assert!(json["bodies"][0]["body"] == "grain");
    }
}
