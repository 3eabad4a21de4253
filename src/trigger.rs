//! Probabilistic landslide trigger
//!
//! A slide picks a seeded epicenter in the middle of the slope and knocks
//! loose grains with a probability that falls off linearly with distance and
//! scales with the probability of failure. Lower safety factors widen the
//! failure zone and throw material harder. Loosened grains are launched along
//! the sign of the slope angle parameter; the surface physics takes over from
//! there. Trees in the inner part of the zone topple by an independent rule.
//!
//! The scarp cut at the end lowers the surface inside the zone so that the
//! terrain has something to relax back from.

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::effects::Effects;
use crate::geotech::RiskSnapshot;
use crate::rng::SlopeRng;
use crate::terrain::{SurfaceQuery, Terrain};

/// Epicenter index range as fractions of the point count.
const EPICENTER_START: f64 = 0.35;
const EPICENTER_SPREAD: f64 = 0.35;
/// FoS below which the zone and the initial speeds grow.
const SAFETY_MARGIN: f64 = 1.5;
/// Share of the zone in which trees can topple.
const TREE_ZONE: f64 = 0.8;
/// Scale of the tree toppling probability.
const TREE_PROBABILITY: f64 = 0.75;
/// Rotation of a toppled tree relative to the local slope (radians).
const TREE_FALL_ANGLE: f64 = 0.3 * std::f64::consts::PI;
/// Draw that must be exceeded for a loosened grain to throw up dust.
const RELEASE_CLOUD_CHANCE: f64 = 0.82;
/// Maximum scarp depth at the epicenter for PoF = 1.
const SCARP_DEPTH: f64 = 12.0;

/// How a slide was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideKind {
    Manual,
    Automatic,
}

impl SlideKind {
    /// Failure-zone half-width before the safety-factor inflation.
    pub fn base_zone(&self) -> f64 {
        match self {
            Self::Manual => 140.0,
            Self::Automatic => 180.0,
        }
    }

    /// Scale applied to PoF for the per-grain probability.
    pub fn probability_scale(&self) -> f64 {
        match self {
            Self::Manual => 0.7,
            Self::Automatic => 0.9,
        }
    }

    /// Failure-zone half-width for a given safety factor.
    pub fn zone_width(&self, fos: f64) -> f64 {
        let deficit = (SAFETY_MARGIN - fos).max(0.5);
        self.base_zone() * (1.0 + deficit * 0.5)
    }
}

impl std::fmt::Display for SlideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Automatic => write!(f, "automatic"),
        }
    }
}

/// Mutable state a slide acts on.
pub struct SlideContext<'a> {
    pub terrain: &'a mut Terrain,
    pub bodies: &'a mut [Body],
    pub effects: &'a mut Effects,
    pub rng: &'a mut SlopeRng,
    pub risk: &'a RiskSnapshot,
    /// Slope angle parameter (degrees) setting the launch direction
    pub slope_angle: f64,
}

/// Outcome of one slide.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlideReport {
    pub kind: SlideKind,
    pub epicenter: f64,
    pub half_width: f64,
    pub fos: f64,
    pub pof: f64,
    pub affected_particles: usize,
    pub toppled_trees: usize,
}

/// Start a slide: choose the epicenter, loosen grains, topple trees and cut
/// the scarp.
pub fn fire(kind: SlideKind, ctx: SlideContext<'_>) -> SlideReport {
    let SlideContext { terrain, bodies, effects, rng, risk, slope_angle } = ctx;
    let (fos, pof) = (risk.fos, risk.pof);
    // Level slopes launch each grain with a coin flip.
    let launch = slope_angle.to_radians().sin();
    let launch = (launch != 0.0).then(|| launch.signum());

    let points = terrain.points();
    let idx = (points.len() as f64 * (EPICENTER_START + EPICENTER_SPREAD * rng.next_f64())) as usize;
    let epicenter = points[idx.min(points.len() - 1)].x;

    let zone = kind.zone_width(fos);
    let base_probability = pof * kind.probability_scale();
    let speed_factor = (SAFETY_MARGIN - fos).max(0.3) * 1.8 + 0.4;

    let mut affected = 0;
    for body in bodies.iter_mut() {
        let Body::Grain(p) = body else { continue };
        if p.fallen {
            continue;
        }
        let dx = (p.x - epicenter).abs();
        if dx >= zone {
            continue;
        }

        let distance_factor = 1.0 - dx / zone;
        let probability = base_probability * distance_factor * (0.6 + 0.7 * rng.next_f64());
        if rng.next_f64() >= probability {
            continue;
        }

        let dir = launch.unwrap_or_else(|| rng.coin());
        let proximity = 0.5 + 0.5 * distance_factor;
        let vx = dir * (0.4 + 0.6 * rng.next_f64()) * speed_factor * proximity;
        let vy = -0.2 * rng.next_f64();
        p.destabilize(vx, vy);

        if rng.next_f64() > RELEASE_CLOUD_CHANCE {
            effects.puff(p.x, p.y, rng);
        }
        affected += 1;
    }

    let tree_zone = zone * TREE_ZONE;
    let mut toppled = 0;
    for body in bodies.iter_mut() {
        let Body::Tree(t) = body else { continue };
        let dx = (t.x - epicenter).abs();
        if dx >= tree_zone {
            continue;
        }
        let distance_factor = 1.0 - dx / tree_zone;
        if rng.next_f64() < pof * TREE_PROBABILITY * distance_factor {
            let side = if t.x > epicenter { 1.0 } else { -1.0 };
            let slope = terrain.slope_angle_at(t.x).unwrap_or(0.0);
            t.topple(slope + side * TREE_FALL_ANGLE);
            toppled += 1;
        }
    }

    terrain.displace(epicenter, zone, SCARP_DEPTH * pof);

    log::info!(
        "{} landslide | FoS {:.3} | PoF {:.2}% | affected {} particles, {} trees",
        kind,
        fos,
        100.0 * pof,
        affected,
        toppled
    );

    SlideReport {
        kind,
        epicenter,
        half_width: zone,
        fos,
        pof,
        affected_particles: affected,
        toppled_trees: toppled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{populate, Particle};
    use crate::geotech::{assess, RainClock};
    use crate::params::{EnvironmentParams, SimulationConfig};

    struct Scene {
        terrain: Terrain,
        bodies: Vec<Body>,
        effects: Effects,
    }

    fn scene() -> Scene {
        let config = SimulationConfig::default();
        let terrain = Terrain::generate(&config, 30.0, &mut SlopeRng::new(42)).unwrap();
        let bodies = populate(&terrain, &config, 0.5, &mut SlopeRng::new(1042));
        Scene { terrain, bodies, effects: Effects::new() }
    }

    fn weak_risk() -> RiskSnapshot {
        let env = EnvironmentParams {
            cohesion: 2.0,
            friction_angle: 20.0,
            slope_angle: 40.0,
            moisture: 0.6,
            erosion: 0.5,
            ..Default::default()
        };
        assess(&env, &RainClock::new(300.0))
    }

    fn run(scene: &mut Scene, kind: SlideKind, seed: u64, risk: &RiskSnapshot) -> SlideReport {
        run_on_slope(scene, kind, seed, risk, 40.0)
    }

    fn run_on_slope(
        scene: &mut Scene,
        kind: SlideKind,
        seed: u64,
        risk: &RiskSnapshot,
        slope_angle: f64,
    ) -> SlideReport {
        fire(
            kind,
            SlideContext {
                terrain: &mut scene.terrain,
                bodies: &mut scene.bodies,
                effects: &mut scene.effects,
                rng: &mut SlopeRng::new(seed),
                risk,
                slope_angle,
            },
        )
    }

    fn loosened(bodies: &[Body]) -> Vec<usize> {
        bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_moving())
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_same_seed_same_slide() {
        let risk = weak_risk();
        let mut a = scene();
        let mut b = scene();
        let ra = run(&mut a, SlideKind::Manual, 7, &risk);
        let rb = run(&mut b, SlideKind::Manual, 7, &risk);
        assert_eq!(ra, rb);
        assert_eq!(a.bodies, b.bodies);
        assert_eq!(a.terrain, b.terrain);
        assert!(ra.affected_particles > 0);
    }

    #[test]
    fn test_different_seeds_different_sets() {
        let risk = weak_risk();
        let mut a = scene();
        let mut b = scene();
        run(&mut a, SlideKind::Manual, 7, &risk);
        run(&mut b, SlideKind::Manual, 8, &risk);
        assert_ne!(loosened(&a.bodies), loosened(&b.bodies));
    }

    #[test]
    fn test_zero_pof_affects_nothing() {
        let risk = RiskSnapshot { pof: 0.0, ..weak_risk() };
        let mut s = scene();
        let before = s.terrain.clone();
        let report = run(&mut s, SlideKind::Automatic, 3, &risk);
        assert_eq!(report.affected_particles, 0);
        assert_eq!(report.toppled_trees, 0);
        assert!(loosened(&s.bodies).is_empty());
        assert_eq!(s.terrain, before);
    }

    #[test]
    fn test_loosened_grains_follow_slope_angle() {
        let risk = weak_risk();
        let mut s = scene();
        let report = run(&mut s, SlideKind::Manual, 11, &risk);

        let expected_zone = 140.0 * (1.0 + (1.5 - risk.fos).max(0.5) * 0.5);
        assert!((report.half_width - expected_zone).abs() < 1e-9);
        assert!(report.affected_particles > 0);

        // Every grain launches along the sign of the slope angle, whatever
        // the local segment under it looks like.
        for body in &s.bodies {
            let Some(p) = body.as_grain().filter(|p| p.is_moving()) else { continue };
            assert!((p.x - report.epicenter).abs() < report.half_width);
            assert!(p.vy <= 0.0);
            assert!(p.vx > 0.0);
        }

        let mut s = scene();
        run_on_slope(&mut s, SlideKind::Manual, 11, &risk, -25.0);
        assert!(s.bodies.iter().filter_map(Body::as_grain).filter(|p| p.is_moving()).all(|p| p.vx < 0.0));
    }

    #[test]
    fn test_level_slope_flips_a_coin_per_grain() {
        let risk = weak_risk();
        let mut s = scene();
        let report = run_on_slope(&mut s, SlideKind::Manual, 11, &risk, 0.0);
        assert!(report.affected_particles > 20);

        let loose: Vec<&Particle> = s.bodies.iter().filter_map(Body::as_grain).filter(|p| p.is_moving()).collect();
        assert!(loose.iter().any(|p| p.vx > 0.0));
        assert!(loose.iter().any(|p| p.vx < 0.0));
    }

    #[test]
    fn test_automatic_zone_is_wider() {
        for fos in [0.4, 1.0, 1.4, 3.0] {
            assert!(SlideKind::Automatic.zone_width(fos) > SlideKind::Manual.zone_width(fos));
        }
        // The deficit term never drops below 0.5.
        assert_eq!(SlideKind::Manual.zone_width(5.0), 140.0 * 1.25);
    }

    #[test]
    fn test_scarp_lowers_surface_at_epicenter() {
        let risk = weak_risk();
        let mut s = scene();
        let before = s.terrain.clone();
        let report = run(&mut s, SlideKind::Manual, 5, &risk);
        let dropped = s
            .terrain
            .points()
            .iter()
            .zip(before.points())
            .any(|(p, q)| p.y > q.y);
        assert!(dropped);
        assert!(report.toppled_trees <= s.bodies.iter().filter(|b| b.as_tree().is_some()).count());
        assert!(s.terrain.points().iter().zip(s.terrain.original()).all(|(p, o)| p.y >= o.y));
    }
}
