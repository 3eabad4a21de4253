//! Bodies living on the slope: grains of material and trees.
//!
//! Both kinds share one collection as a tagged variant. They see the ground
//! only through [`SurfaceQuery`], so resting on the surface is the same rule
//! for both.

pub mod particle;
pub mod tree;

pub use particle::{GrainKind, Particle, SlopeForcing, TRAIL_MOMENTUM};
pub use tree::Tree;

use serde::{Deserialize, Serialize};

use crate::params::SimulationConfig;
use crate::rng::SlopeRng;
use crate::terrain::{SurfaceQuery, Terrain};

/// Vertical spacing between stacked grain layers.
const LAYER_SPACING: f64 = 1.8;
/// Positional jitter of a cell's sample point.
const CELL_JITTER: f64 = 1.5;

/// A body on the slope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum Body {
    Grain(Particle),
    Tree(Tree),
}

impl Body {
    pub fn x(&self) -> f64 {
        match self {
            Body::Grain(p) => p.x,
            Body::Tree(t) => t.x,
        }
    }

    pub fn as_grain(&self) -> Option<&Particle> {
        match self {
            Body::Grain(p) => Some(p),
            Body::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Body::Tree(t) => Some(t),
            Body::Grain(_) => None,
        }
    }

    /// A grain still in motion.
    pub fn is_moving(&self) -> bool {
        matches!(self, Body::Grain(p) if p.is_moving())
    }

    /// Nothing left to animate: grains at rest or gone, trees upright or down.
    pub fn is_settled(&self) -> bool {
        match self {
            Body::Grain(p) => !p.is_moving(),
            Body::Tree(t) => t.is_settled(),
        }
    }

    /// Snap resting bodies onto the surface beneath them. Moving and fallen
    /// grains are left alone.
    pub fn pin_to_surface<S: SurfaceQuery>(&mut self, surface: &S) {
        match self {
            Body::Grain(p) if p.stable && !p.fallen => p.rest_on(surface),
            Body::Grain(_) => {}
            Body::Tree(t) => t.rest_on(surface),
        }
    }
}

/// Fill the slope with grains and trees.
///
/// Every segment is cut into cells of about `cell_spacing`; each cell gets a
/// jittered sample point with 3-4 stacked grains. Trees are then scattered
/// over the sample points, more of them the greener the slope.
pub fn populate(
    terrain: &Terrain,
    config: &SimulationConfig,
    vegetation: f64,
    rng: &mut SlopeRng,
) -> Vec<Body> {
    let points = terrain.points();
    let mut bodies = Vec::new();

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let seg_len = (b.x - a.x).hypot(b.y - a.y);
        let cells = (seg_len / config.cell_spacing).ceil() as usize;

        for c in 0..cells {
            let t = c as f64 / cells as f64;
            let px = a.x + (b.x - a.x) * t + CELL_JITTER * rng.centered();
            let py = a.y + (b.y - a.y) * t + CELL_JITTER * rng.centered();
            let layers = 3 + (rng.next_f64() * 2.0) as usize;

            for s in 0..layers {
                let kind = GrainKind::draw(vegetation, rng);
                let grain = Particle::new(px, py - s as f64 * LAYER_SPACING, kind, rng);
                bodies.push(Body::Grain(grain));
            }
        }
    }

    let grains = bodies.len();
    let tree_count = (5.0 + vegetation * 45.0) as usize;
    let anchors = points.len().saturating_sub(2).max(1);
    for _ in 0..tree_count {
        let idx = (rng.next_f64() * anchors as f64) as usize;
        let Some(base) = points.get(idx) else { continue };
        let size = 2.0 + 3.0 * rng.next_f64();
        bodies.push(Body::Tree(Tree::new(base.x, base.y, size)));
    }

    log::debug!(
        "populated {} grains and {} trees over {} segments",
        grains,
        bodies.len() - grains,
        points.len().saturating_sub(1)
    );

    bodies
}
