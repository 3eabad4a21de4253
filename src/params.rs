//! Simulation parameters and configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Environmental and geotechnical inputs for one risk evaluation.
///
/// Fractions (`vegetation`, `erosion`, `moisture`) are in `[0, 1]`.
/// `ru` is derived by the calculator and is never read from input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentParams {
    /// Vegetation cover fraction
    pub vegetation: f64,
    /// Surface erosion fraction
    pub erosion: f64,
    /// Antecedent soil moisture fraction (baseline pore-pressure ratio)
    pub moisture: f64,
    /// Rain intensity (mm/hr)
    pub rain_intensity: f64,
    /// Saturated hydraulic conductivity (m/s)
    pub hydraulic_conductivity: f64,
    /// Depth of the sliding soil layer (m)
    pub soil_depth: f64,
    /// Soil unit weight (kN/m^3)
    pub unit_weight: f64,
    /// Cohesion (kPa)
    pub cohesion: f64,
    /// Internal friction angle (degrees)
    pub friction_angle: f64,
    /// Slope angle (degrees)
    pub slope_angle: f64,
    /// Coefficient of variation applied to FoS for the failure probability
    pub fos_cov: f64,
    /// Pore-pressure ratio, filled in by the calculator
    #[serde(skip)]
    pub ru: f64,
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            vegetation: 0.5,
            erosion: 0.2,
            moisture: 0.3,
            rain_intensity: 10.0,
            hydraulic_conductivity: 5.0e-6,
            soil_depth: 3.0,
            unit_weight: 19.0,
            cohesion: 15.0,
            friction_angle: 32.0,
            slope_angle: 30.0,
            fos_cov: 0.15,
            ru: 0.0,
        }
    }
}

impl EnvironmentParams {
    /// Clamp inputs into their usable ranges instead of rejecting them.
    /// Non-finite values fall back to the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let pick = |v: f64, d: f64| if v.is_finite() { v } else { d };
        Self {
            vegetation: pick(self.vegetation, defaults.vegetation).clamp(0.0, 1.0),
            erosion: pick(self.erosion, defaults.erosion).clamp(0.0, 1.0),
            moisture: pick(self.moisture, defaults.moisture).clamp(0.0, 1.0),
            rain_intensity: pick(self.rain_intensity, defaults.rain_intensity).max(0.0),
            hydraulic_conductivity: pick(self.hydraulic_conductivity, defaults.hydraulic_conductivity)
                .max(0.0),
            soil_depth: pick(self.soil_depth, defaults.soil_depth).max(0.0),
            unit_weight: pick(self.unit_weight, defaults.unit_weight).max(0.0),
            cohesion: pick(self.cohesion, defaults.cohesion).max(0.0),
            friction_angle: pick(self.friction_angle, defaults.friction_angle),
            slope_angle: pick(self.slope_angle, defaults.slope_angle),
            fos_cov: pick(self.fos_cov, defaults.fos_cov),
            ru: pick(self.ru, 0.0),
        }
    }

    /// Copy with a calculated pore-pressure ratio.
    pub fn with_pore_ratio(&self, ru: f64) -> Self {
        Self { ru, ..self.clone() }
    }
}

/// Engine configuration: canvas extent, generation resolution and timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Visible width in simulation units
    pub width: f64,
    /// Visible height in simulation units (y grows downwards)
    pub height: f64,
    /// Number of terrain sample points
    pub terrain_points: usize,
    /// Moving-average passes applied after generation
    pub smoothing_passes: usize,
    /// Target spacing of particle cells along a terrain segment
    pub cell_spacing: f64,
    /// Simulated hydrological seconds per wall-clock second while raining
    pub time_acceleration: f64,
    /// Delay between an elevated-risk reading and the automatic slide (seconds)
    pub auto_trigger_delay: f64,
    /// Capacity of the FoS/PoF trend buffer
    pub trend_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 450.0,
            terrain_points: 140,
            smoothing_passes: 4,
            cell_spacing: 3.5,
            time_acceleration: 300.0,
            auto_trigger_delay: 0.8,
            trend_capacity: 300,
        }
    }
}

impl SimulationConfig {
    /// Check the configuration before it is used to build a simulation.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(SimError::InvalidConfig(format!("width must be positive, got {}", self.width)));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(SimError::InvalidConfig(format!("height must be positive, got {}", self.height)));
        }
        if !(self.cell_spacing.is_finite() && self.cell_spacing > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "cell_spacing must be positive, got {}",
                self.cell_spacing
            )));
        }
        if self.trend_capacity == 0 {
            return Err(SimError::InvalidConfig("trend_capacity must be at least 1".into()));
        }
        if self.terrain_points < 2 {
            return Err(SimError::DegenerateTerrain { points: self.terrain_points });
        }
        Ok(())
    }
}

/// Visible canvas extent that bodies and effects live in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Margin past the bottom edge before a body counts as gone.
    pub const FALL_MARGIN: f64 = 30.0;
    /// Margin past either side edge before a body counts as gone.
    pub const SIDE_MARGIN: f64 = 60.0;

    /// Whether a point has left the visible area for good.
    pub fn has_exited(&self, x: f64, y: f64) -> bool {
        y > self.height + Self::FALL_MARGIN
            || x < -Self::SIDE_MARGIN
            || x > self.width + Self::SIDE_MARGIN
    }
}

impl From<&SimulationConfig> for Bounds {
    fn from(config: &SimulationConfig) -> Self {
        Self { width: config.width, height: config.height }
    }
}

/// Configuration plus initial environment, as loaded from a scenario file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: SimulationConfig,
    pub environment: EnvironmentParams,
}

impl Scenario {
    /// Parse a scenario from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_environment() {
        let env = EnvironmentParams::default();
        assert_eq!(env.vegetation, 0.5);
        assert_eq!(env.slope_angle, 30.0);
        assert_eq!(env.cohesion, 15.0);
        assert_eq!(env.ru, 0.0);
    }

    #[test]
    fn test_sanitized_clamps_fractions() {
        let env = EnvironmentParams {
            vegetation: 1.7,
            erosion: -0.3,
            moisture: f64::NAN,
            rain_intensity: -5.0,
            ..Default::default()
        };
        let clean = env.sanitized();
        assert_eq!(clean.vegetation, 1.0);
        assert_eq!(clean.erosion, 0.0);
        assert_eq!(clean.moisture, 0.3);
        assert_eq!(clean.rain_intensity, 0.0);
    }

    #[test]
    fn test_scenario_partial_json() {
        let json = r#"{ "environment": { "cohesion": 8.0 }, "config": { "terrain_points": 60 } }"#;
        let scenario = Scenario::from_json_str(json).unwrap();
        assert_eq!(scenario.environment.cohesion, 8.0);
        assert_eq!(scenario.environment.friction_angle, 32.0);
        assert_eq!(scenario.config.terrain_points, 60);
        assert_eq!(scenario.config.width, 900.0);
    }

    #[test]
    fn test_scenario_rejects_degenerate_terrain() {
        let json = r#"{ "config": { "terrain_points": 1 } }"#;
        assert!(matches!(
            Scenario::from_json_str(json),
            Err(SimError::DegenerateTerrain { points: 1 })
        ));
    }

    #[test]
    fn test_scenario_rejects_bad_json() {
        assert!(matches!(Scenario::from_json_str("{ nope"), Err(SimError::Json(_))));
    }

    #[test]
    fn test_ru_is_not_serialized() {
        let env = EnvironmentParams::default().with_pore_ratio(0.4);
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("\"ru\""));
    }
}
