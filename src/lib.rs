//! Landslide simulation library
//!
//! Infinite-slope risk model driving a seeded particle simulation of a slope
//! failing. Re-exports modules for use by binaries and tools.

pub mod body;
pub mod effects;
pub mod error;
pub mod geotech;
pub mod history;
pub mod params;
pub mod rng;
pub mod simulation;
pub mod terrain;
pub mod trigger;

pub use error::SimError;
pub use geotech::{RiskLevel, RiskSnapshot};
pub use params::{EnvironmentParams, Scenario, SimulationConfig};
pub use simulation::{Frame, Simulation};
pub use trigger::{SlideKind, SlideReport};
