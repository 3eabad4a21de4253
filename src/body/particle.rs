//! Granular slope material: soil, rock and vegetation grains.

use serde::{Deserialize, Serialize};

use crate::effects::{DebrisPile, Effects, Hsl};
use crate::params::Bounds;
use crate::rng::SlopeRng;
use crate::terrain::SurfaceQuery;

/// Gravity per tick per unit mass while airborne.
const GRAVITY: f64 = 0.2;
/// Terminal fall speed per tick.
const MAX_FALL_SPEED: f64 = 10.0;
/// Lateral velocity kept per airborne tick.
const AIR_DRAG: f64 = 0.98;
/// A grain this close above the surface rides it.
const CONTACT_DISTANCE: f64 = 8.0;
/// Scale of the downslope acceleration.
const DOWNSLOPE_FORCE: f64 = 0.5;
/// Scale of the lateral jitter on steep ground.
const JITTER: f64 = 0.05;
/// Grains slower than this on near-flat ground come to rest.
const SETTLE_SPEED: f64 = 0.02;
/// |sin(slope)| below which ground counts as flat.
const SETTLE_SLOPE: f64 = 0.05;
/// Grains slower than this stop when they cross the bottom of a hollow.
const HOLLOW_SPEED: f64 = 0.5;
/// Speed above which a grain may throw up a dust cloud.
const CLOUD_SPEED: f64 = 1.5;
/// Draw that must be exceeded to spawn that cloud.
const CLOUD_CHANCE: f64 = 0.96;
/// Momentum above which the renderer draws a motion trail.
pub const TRAIL_MOMENTUM: f64 = 0.7;

/// Material of a grain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrainKind {
    Soil,
    Rock,
    Vegetation,
}

impl GrainKind {
    /// Draw a kind: 8% rock, then a vegetation band of `30 * vegetation`
    /// percent, the rest soil.
    pub fn draw(vegetation: f64, rng: &mut SlopeRng) -> Self {
        let r = 100.0 * rng.next_f64();
        if r < 8.0 {
            Self::Rock
        } else if r < 8.0 + 30.0 * vegetation {
            Self::Vegetation
        } else {
            Self::Soil
        }
    }

    pub fn size(&self) -> f64 {
        match self {
            Self::Rock => 3.0,
            Self::Vegetation => 2.2,
            Self::Soil => 1.8,
        }
    }

    pub fn mass(&self) -> f64 {
        match self {
            Self::Rock => 1.5,
            Self::Vegetation => 0.7,
            Self::Soil => 1.0,
        }
    }

    /// Lateral velocity retained per tick on the slope, before wetness.
    /// Rock keeps its speed longest, vegetation stops fastest.
    pub fn damping(&self) -> f64 {
        match self {
            Self::Rock => 0.97,
            Self::Vegetation => 0.88,
            Self::Soil => 0.92,
        }
    }

    fn color(&self, t: f64) -> Hsl {
        match self {
            Self::Vegetation => Hsl::new(110.0 + 20.0 * t, 60.0 + 20.0 * t, 40.0 + 15.0 * t),
            Self::Rock => Hsl::new(0.0, 0.0, 45.0 + 20.0 * t),
            Self::Soil => Hsl::new(25.0 + 10.0 * t, 45.0 + 15.0 * t, 35.0 + 15.0 * t),
        }
    }
}

/// Environmental inputs to the per-tick grain physics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlopeForcing {
    pub vegetation: f64,
    pub erosion: f64,
    pub ru: f64,
}

/// One grain of slope material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub initial_x: f64,
    pub initial_y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub mass: f64,
    pub kind: GrainKind,
    pub stable: bool,
    /// Terminal: the grain has left the canvas
    pub fallen: bool,
    pub momentum: f64,
    /// Downhill direction (-1, 0 or 1) of the ground ridden last tick
    pub downhill: f64,
    pub color: Hsl,
}

impl Particle {
    /// Create a resting grain. Consumes one draw for its colour.
    pub fn new(x: f64, y: f64, kind: GrainKind, rng: &mut SlopeRng) -> Self {
        let color = kind.color(rng.next_f64());
        Self {
            x,
            y,
            initial_x: x,
            initial_y: y,
            vx: 0.0,
            vy: 0.0,
            size: kind.size(),
            mass: kind.mass(),
            kind,
            stable: true,
            fallen: false,
            momentum: 0.0,
            downhill: 0.0,
            color,
        }
    }

    /// Still sliding or falling.
    pub fn is_moving(&self) -> bool {
        !self.stable && !self.fallen
    }

    /// Knock the grain loose with an initial velocity.
    pub fn destabilize(&mut self, vx: f64, vy: f64) {
        self.stable = false;
        self.vx = vx;
        self.vy = vy;
    }

    /// Advance one tick. Resting and fallen grains are untouched.
    pub fn update<S: SurfaceQuery>(
        &mut self,
        surface: &S,
        forcing: &SlopeForcing,
        bounds: &Bounds,
        rng: &mut SlopeRng,
        effects: &mut Effects,
    ) {
        if !self.is_moving() {
            return;
        }

        let contact = surface
            .segment_at(self.x)
            .map(|seg| (seg.height_at(self.x), seg.angle()))
            .filter(|&(base_y, _)| self.y >= base_y - CONTACT_DISTANCE);

        match contact {
            Some((base_y, slope)) => self.ride(base_y, slope, forcing, rng, effects),
            None => {
                self.vy = (self.vy + GRAVITY * self.mass).min(MAX_FALL_SPEED);
                self.vx *= AIR_DRAG;
            }
        }

        self.x += self.vx;
        self.y += self.vy;
        self.momentum = self.vx.hypot(self.vy);

        if bounds.has_exited(self.x, self.y) {
            self.fallen = true;
            if self.x >= 0.0 && self.x <= bounds.width {
                effects.deposit(DebrisPile {
                    x: self.x,
                    y: bounds.height - 3.0,
                    size: self.size * 0.7,
                    color: self.color,
                });
            }
        }
    }

    /// Surface-contact branch: slide along the ground.
    fn ride(
        &mut self,
        base_y: f64,
        slope: f64,
        forcing: &SlopeForcing,
        rng: &mut SlopeRng,
        effects: &mut Effects,
    ) {
        self.y = base_y - self.size * 0.6;

        // Downhill flipped to point against the motion: the grain just
        // crossed the bottom of a hollow.
        let downhill = if slope == 0.0 { 0.0 } else { slope.signum() };
        let in_hollow = self.downhill * downhill < 0.0
            && downhill * self.vx < 0.0
            && self.vx.abs() < HOLLOW_SPEED;
        self.downhill = downhill;

        let sin_slope = slope.sin();
        let retention = match self.kind {
            GrainKind::Vegetation => 1.0 - forcing.vegetation * 0.8,
            _ => 1.0,
        };
        let down_force = slope.signum() * sin_slope.abs() * DOWNSLOPE_FORCE * retention;
        let ru_boost = 1.0 + 2.0 * forcing.ru;
        let erosion_boost = 1.0 + 1.2 * forcing.erosion;

        self.vx += down_force * ru_boost * erosion_boost;
        self.vx += JITTER * rng.centered() * sin_slope.abs();
        self.vx *= (self.kind.damping() - 0.3 * forcing.ru).max(0.6);
        self.vy = 0.0;

        if in_hollow || (self.vx.abs() < SETTLE_SPEED && sin_slope.abs() < SETTLE_SLOPE) {
            self.stable = true;
            self.vx = 0.0;
            effects.deposit(DebrisPile { x: self.x, y: base_y, size: self.size, color: self.color });
        }

        if self.vx.abs() > CLOUD_SPEED && rng.next_f64() > CLOUD_CHANCE {
            effects.puff(self.x, self.y, rng);
        }
    }

    /// Rest exactly on the surface below.
    pub fn rest_on<S: SurfaceQuery>(&mut self, surface: &S) {
        self.y = surface.resting_height_at(self.x) - 0.5 * self.size;
    }

    /// End point of the motion trail, when the grain is fast enough to show one.
    pub fn trail(&self) -> Option<(f64, f64)> {
        (!self.fallen && self.momentum > TRAIL_MOMENTUM)
            .then(|| (self.x - 2.0 * self.vx, self.y - 2.0 * self.vy))
    }
}
