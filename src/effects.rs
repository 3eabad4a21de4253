//! Ephemeral effects: debris clouds, raindrops and debris piles.
//!
//! Clouds and raindrops are short-lived and expire on their own. Piles are
//! permanent markers left where material came to rest.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::params::Bounds;
use crate::rng::SlopeRng;
use crate::terrain::SurfaceQuery;

/// Life lost by a debris cloud per tick.
const CLOUD_DECAY: f64 = 0.02;
/// Downward acceleration of a debris cloud per tick.
const CLOUD_GRAVITY: f64 = 0.07;
/// Lateral velocity retained by a debris cloud per tick.
const CLOUD_DRAG: f64 = 0.97;
/// Height above the canvas where raindrops start.
const RAIN_START_Y: f64 = -15.0;
/// Raindrops leaving the bottom by this much are dropped.
const RAIN_EXIT_MARGIN: f64 = 15.0;

/// Colour in HSL space (hue degrees, saturation and lightness percent).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }
}

impl std::fmt::Display for Hsl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hsl({:.0},{:.0}%,{:.0}%)", self.h, self.s, self.l)
    }
}

/// A puff of dust thrown up by fast-moving material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebrisCloud {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    /// Remaining life in `(0, 1]`
    pub life: f64,
}

impl DebrisCloud {
    pub fn new(x: f64, y: f64, rng: &mut SlopeRng) -> Self {
        let vx = 2.0 * rng.centered();
        let vy = -1.5 * rng.next_f64();
        let size = 3.0 + 4.0 * rng.next_f64();
        Self { x, y, vx, vy, size, life: 1.0 }
    }

    pub fn update(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        self.vy += CLOUD_GRAVITY;
        self.vx *= CLOUD_DRAG;
        self.life -= CLOUD_DECAY;
    }

    pub fn is_alive(&self, bounds: &Bounds) -> bool {
        self.life > 0.0 && !bounds.has_exited(self.x, self.y)
    }
}

/// A falling raindrop streak.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Raindrop {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub length: f64,
}

impl Raindrop {
    /// Spawn above the canvas at a random x.
    pub fn spawn(width: f64, weather: &mut ChaCha8Rng) -> Self {
        Self {
            x: weather.gen_range(0.0..width.max(f64::EPSILON)),
            y: RAIN_START_Y,
            speed: weather.gen_range(6.0..12.0),
            length: weather.gen_range(12.0..22.0),
        }
    }

    /// Advance the drop; returns false once it hits the ground or leaves the canvas.
    pub fn update<S: SurfaceQuery>(&mut self, surface: &S, bounds: &Bounds) -> bool {
        self.y += self.speed;
        if let Some(ground) = surface.surface_height_at(self.x) {
            if self.y >= ground {
                return false;
            }
        }
        self.y < bounds.height + RAIN_EXIT_MARGIN
    }
}

/// Permanent residue marker left by settled or departed material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebrisPile {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: Hsl,
}

/// All secondary effects owned by a simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Effects {
    pub clouds: Vec<DebrisCloud>,
    pub raindrops: Vec<Raindrop>,
    pub piles: Vec<DebrisPile>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a debris cloud at a point.
    pub fn puff(&mut self, x: f64, y: f64, rng: &mut SlopeRng) {
        self.clouds.push(DebrisCloud::new(x, y, rng));
    }

    /// Leave a permanent pile marker.
    pub fn deposit(&mut self, pile: DebrisPile) {
        self.piles.push(pile);
    }

    /// Advance clouds and raindrops, dropping the expired ones.
    pub fn update<S: SurfaceQuery>(&mut self, surface: &S, bounds: &Bounds) {
        self.raindrops.retain_mut(|drop| drop.update(surface, bounds));
        self.clouds.retain_mut(|cloud| {
            cloud.update();
            cloud.is_alive(bounds)
        });
    }

    /// Whether any transient effect is still running.
    pub fn is_active(&self) -> bool {
        !self.clouds.is_empty() || !self.raindrops.is_empty()
    }

    /// Remove everything, piles included.
    pub fn clear(&mut self) {
        self.clouds.clear();
        self.raindrops.clear();
        self.piles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{Terrain, TerrainPoint};
    use rand::SeedableRng;

    fn flat(y: f64) -> Terrain {
        Terrain::from_points(vec![TerrainPoint::new(0.0, y), TerrainPoint::new(100.0, y)]).unwrap()
    }

    fn bounds() -> Bounds {
        Bounds { width: 100.0, height: 200.0 }
    }

    #[test]
    fn test_cloud_expires() {
        let mut effects = Effects::new();
        let mut rng = SlopeRng::new(5);
        effects.puff(50.0, 50.0, &mut rng);
        let terrain = flat(150.0);

        let mut ticks = 0;
        while effects.is_active() {
            effects.update(&terrain, &bounds());
            ticks += 1;
            assert!(ticks <= 51);
        }
        assert!(ticks >= 1);
    }

    #[test]
    fn test_cloud_draws_from_stream() {
        let mut a = SlopeRng::new(11);
        let mut b = SlopeRng::new(11);
        let cloud = DebrisCloud::new(0.0, 0.0, &mut a);
        assert!(cloud.vy <= 0.0);
        assert!(cloud.size >= 3.0 && cloud.size < 7.0);
        for _ in 0..3 {
            b.next_f64();
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_raindrop_stops_at_ground() {
        let terrain = flat(40.0);
        let mut weather = ChaCha8Rng::seed_from_u64(1);
        let mut drop = Raindrop::spawn(100.0, &mut weather);
        let mut steps = 0;
        while drop.update(&terrain, &bounds()) {
            steps += 1;
            assert!(drop.y < 40.0);
        }
        assert!(steps > 0);
    }

    #[test]
    fn test_raindrop_off_terrain_leaves_bottom() {
        let terrain = flat(40.0);
        let mut drop = Raindrop { x: 150.0, y: 0.0, speed: 10.0, length: 12.0 };
        let mut steps = 0;
        while drop.update(&terrain, &bounds()) {
            steps += 1;
        }
        assert_eq!(steps, 21);
    }

    #[test]
    fn test_piles_survive_updates() {
        let mut effects = Effects::new();
        effects.deposit(DebrisPile { x: 1.0, y: 2.0, size: 1.8, color: Hsl::new(30.0, 50.0, 40.0) });
        effects.update(&flat(100.0), &bounds());
        assert_eq!(effects.piles.len(), 1);
        assert!(!effects.is_active());
    }
}
