//! Trees anchored to the slope surface.

use serde::{Deserialize, Serialize};

use crate::terrain::SurfaceQuery;

/// Fraction of the remaining rotation closed per tick while toppling.
const TOPPLE_RATE: f64 = 0.1;
/// Rotation still left when a toppling tree counts as down.
const TOPPLE_TOLERANCE: f64 = 1e-3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub fallen: bool,
    /// Current rotation (radians)
    pub angle: f64,
    pub target_angle: f64,
}

impl Tree {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self { x, y, size, fallen: false, angle: 0.0, target_angle: 0.0 }
    }

    /// Start toppling toward `target_angle`.
    pub fn topple(&mut self, target_angle: f64) {
        self.fallen = true;
        self.target_angle = target_angle;
    }

    /// Ease the rotation toward its target.
    pub fn update(&mut self) {
        if self.fallen {
            self.angle += TOPPLE_RATE * (self.target_angle - self.angle);
        }
    }

    /// Standing, or finished toppling.
    pub fn is_settled(&self) -> bool {
        !self.fallen || (self.target_angle - self.angle).abs() < TOPPLE_TOLERANCE
    }

    pub fn rest_on<S: SurfaceQuery>(&mut self, surface: &S) {
        self.y = surface.resting_height_at(self.x);
    }
}
