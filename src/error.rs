//! Error types for the slope simulator.
//!
//! Numeric edge cases (flat slopes, zero uncertainty, degenerate segments) are
//! handled by clamping inside the calculators and never surface here.

use thiserror::Error;

/// Errors raised while building or configuring a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Terrain generation produced too few points to form a segment.
    #[error("terrain needs at least 2 points, got {points}")]
    DegenerateTerrain { points: usize },

    /// A supplied terrain profile is not strictly increasing in x.
    #[error("terrain x must be strictly increasing (violated at index {index})")]
    UnorderedTerrain { index: usize },

    /// Configuration values outside their usable range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Scenario JSON could not be parsed.
    #[error("scenario parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scenario file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
