//! 1-D terrain height field
//!
//! The ground surface is an ordered polyline spanning the visible width. Screen
//! convention: y grows downwards, so a larger y is a lower surface.
//!
//! Generation:
//! 1. Linear slope component from the slope angle
//! 2. Downward parabolic bow concentrated mid-profile
//! 3. Small per-point seeded noise, clamped into a vertical band
//! 4. Moving-average smoothing, then a snapshot used as the relaxation target

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::params::SimulationConfig;
use crate::rng::SlopeRng;

/// Distance kept between the surface and the top/bottom of the canvas.
pub const BAND_MARGIN: f64 = 70.0;
/// Baseline elevation as a fraction of canvas height.
const BASE_LEVEL: f64 = 0.82;
/// Amplitude of the parabolic bow.
const BOW_AMPLITUDE: f64 = 180.0;
/// Peak-to-peak amplitude of the per-point noise.
const NOISE_AMPLITUDE: f64 = 30.0;
/// Fraction of the remaining gap closed per relaxation step.
const RELAX_RATE: f64 = 0.05;
/// Gaps at or below this are considered settled.
const RELAX_TOLERANCE: f64 = 0.5;

/// One sample of the ground surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainPoint {
    pub x: f64,
    pub y: f64,
}

impl TerrainPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A straight piece of the surface between two consecutive points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: TerrainPoint,
    pub b: TerrainPoint,
}

impl Segment {
    /// Interpolation fraction of `x` along the segment. Degenerate segments
    /// (zero width) yield 0.
    pub fn fraction(&self, x: f64) -> f64 {
        let t = (x - self.a.x) / (self.b.x - self.a.x);
        if t.is_finite() { t } else { 0.0 }
    }

    /// Linearly interpolated surface height at `x`.
    pub fn height_at(&self, x: f64) -> f64 {
        self.a.y + (self.b.y - self.a.y) * self.fraction(x)
    }

    /// Local slope angle in radians (negative when the surface rises to the right).
    pub fn angle(&self) -> f64 {
        (self.b.y - self.a.y).atan2(self.b.x - self.a.x)
    }
}

/// Read access to a ground surface.
///
/// Bodies only see the terrain through this trait, so the lookup strategy can
/// change without touching the particle or tree update rules.
pub trait SurfaceQuery {
    /// Segment whose x-range contains `x`, if any.
    fn segment_at(&self, x: f64) -> Option<Segment>;

    /// Segment starting at the sample point nearest to `x`. Never fails; at the
    /// last point the segment degenerates to that point.
    fn nearest_segment(&self, x: f64) -> Segment;

    /// Surface height directly under `x`, if `x` lies over the terrain.
    fn surface_height_at(&self, x: f64) -> Option<f64> {
        self.segment_at(x).map(|s| s.height_at(x))
    }

    /// Local slope angle (radians) under `x`, if `x` lies over the terrain.
    fn slope_angle_at(&self, x: f64) -> Option<f64> {
        self.segment_at(x).map(|s| s.angle())
    }

    /// Height used to rest bodies on the surface, via nearest-point lookup.
    fn resting_height_at(&self, x: f64) -> f64 {
        self.nearest_segment(x).height_at(x)
    }
}

/// The ground surface plus its post-generation snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Terrain {
    points: Vec<TerrainPoint>,
    original: Vec<TerrainPoint>,
    band: (f64, f64),
}

impl Terrain {
    /// Generate a smoothed terrain profile for the given slope angle.
    pub fn generate(
        config: &SimulationConfig,
        slope_angle_deg: f64,
        rng: &mut SlopeRng,
    ) -> Result<Self, SimError> {
        let n = config.terrain_points;
        if n < 2 {
            return Err(SimError::DegenerateTerrain { points: n });
        }

        let band = (BAND_MARGIN, config.height - BAND_MARGIN);
        let tan_slope = slope_angle_deg.to_radians().tan();
        let last = (n - 1) as f64;

        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let t = i as f64 / last;
            let x = t * config.width;
            let y = BASE_LEVEL * config.height
                - t * config.width * tan_slope
                - BOW_AMPLITUDE * (t - 0.5).powi(2)
                + NOISE_AMPLITUDE * rng.centered();
            points.push(TerrainPoint::new(x, clamp_band(y, band)));
        }

        let mut terrain = Self { original: Vec::new(), points, band };
        terrain.smooth(config.smoothing_passes);
        terrain.original = terrain.points.clone();
        Ok(terrain)
    }

    /// Build a terrain from explicit points. The vertical band is unbounded.
    pub fn from_points(points: Vec<TerrainPoint>) -> Result<Self, SimError> {
        if points.len() < 2 {
            return Err(SimError::DegenerateTerrain { points: points.len() });
        }
        if let Some(index) = points.windows(2).position(|w| !(w[1].x > w[0].x)) {
            return Err(SimError::UnorderedTerrain { index: index + 1 });
        }
        Ok(Self {
            original: points.clone(),
            points,
            band: (f64::NEG_INFINITY, f64::INFINITY),
        })
    }

    /// Restrict displacement to a vertical band.
    pub fn with_band(mut self, top: f64, bottom: f64) -> Self {
        self.band = (top, bottom);
        self
    }

    /// Apply 3-point moving-average passes over the interior points.
    /// Each pass runs left to right in place; endpoints are untouched.
    pub fn smooth(&mut self, passes: usize) {
        let n = self.points.len();
        for _ in 0..passes {
            for i in 1..n.saturating_sub(1) {
                self.points[i].y =
                    (self.points[i - 1].y + self.points[i].y + self.points[i + 1].y) / 3.0;
            }
        }
    }

    pub fn points(&self) -> &[TerrainPoint] {
        &self.points
    }

    /// Snapshot taken right after generation.
    pub fn original(&self) -> &[TerrainPoint] {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Move every point 5% of the way back toward its original height when the
    /// gap exceeds the tolerance. Returns whether anything moved.
    pub fn relax_toward_original(&mut self) -> bool {
        let mut moved = false;
        for (p, o) in self.points.iter_mut().zip(&self.original) {
            let diff = o.y - p.y;
            if diff.abs() > RELAX_TOLERANCE {
                p.y += diff * RELAX_RATE;
                moved = true;
            }
        }
        moved
    }

    /// True once every point is within tolerance of its original height.
    pub fn is_relaxed(&self) -> bool {
        self.points
            .iter()
            .zip(&self.original)
            .all(|(p, o)| (o.y - p.y).abs() <= RELAX_TOLERANCE)
    }

    /// Lower the surface around `epicenter`, deepest at the centre and fading
    /// to nothing at `half_width`.
    pub fn displace(&mut self, epicenter: f64, half_width: f64, depth: f64) {
        if !(half_width > 0.0) || depth == 0.0 {
            return;
        }
        let band = self.band;
        for p in &mut self.points {
            let dx = (p.x - epicenter).abs();
            if dx < half_width {
                let falloff = 1.0 - dx / half_width;
                p.y = clamp_band(p.y + depth * falloff, band);
            }
        }
    }

    /// Index of the sample point closest to `x`; ties go to the lower index.
    fn nearest_index(&self, x: f64) -> usize {
        let j = self.points.partition_point(|p| p.x < x);
        if j == 0 {
            return 0;
        }
        if j == self.points.len() {
            return j - 1;
        }
        let left = (x - self.points[j - 1].x).abs();
        let right = (self.points[j].x - x).abs();
        if left <= right { j - 1 } else { j }
    }
}

impl SurfaceQuery for Terrain {
    fn segment_at(&self, x: f64) -> Option<Segment> {
        let j = self.points.partition_point(|p| p.x < x);
        let i = match j {
            0 if self.points[0].x == x => 0,
            0 => return None,
            j if j == self.points.len() => return None,
            j => j - 1,
        };
        Some(Segment { a: self.points[i], b: self.points[i + 1] })
    }

    fn nearest_segment(&self, x: f64) -> Segment {
        let i = self.nearest_index(x);
        let a = self.points[i];
        let b = self.points.get(i + 1).copied().unwrap_or(a);
        Segment { a, b }
    }
}

fn clamp_band(y: f64, band: (f64, f64)) -> f64 {
    y.max(band.0).min(band.1)
}
