//! Geotechnical risk calculator
//!
//! Closed-form infinite-slope stability with a rain-driven pore-pressure ratio,
//! and a normal-distribution model turning the factor of safety into a
//! probability of failure. All functions are pure given an environment
//! snapshot and the rain clock.

use serde::{Deserialize, Serialize};

use crate::params::EnvironmentParams;

/// Unit weight of water (kN/m^3)
pub const GAMMA_W: f64 = 9.81;
/// FoS reported for slopes with no driving stress
pub const FOS_SENTINEL: f64 = 999.0;
/// Upper clamp for computed FoS
pub const FOS_MAX: f64 = 20.0;
/// Failure threshold for FoS
pub const FOS_FAILURE: f64 = 1.0;

/// Soil porosity used by the infiltration approximation
const POROSITY: f64 = 0.35;
/// Scale applied to the infiltration-driven ru rise
const INFILTRATION_GAIN: f64 = 1.5;
/// Maximum ru rise from infiltration alone
const MAX_RU_INCREASE: f64 = 0.70;
/// Maximum total pore-pressure ratio
const MAX_RU: f64 = 0.95;
/// Erosion contribution to ru while dry / while raining
const DRY_EROSION_RU: f64 = 0.08;
const WET_EROSION_RU: f64 = 0.15;
/// Root reinforcement and erosion degradation of cohesion
const VEGETATION_COHESION_GAIN: f64 = 0.18;
const EROSION_COHESION_LOSS: f64 = 0.50;
const MIN_COHESION: f64 = 0.5;
/// Friction angle gain (degrees) at full vegetation
const VEGETATION_FRICTION_GAIN: f64 = 1.5;
/// Driving stress below which the slope is treated as flat
const FLAT_DRIVING_STRESS: f64 = 1e-6;

/// Accumulated rain time.
///
/// `elapsed` is wall-clock seconds of active rain; the hydrology runs on
/// compressed time, `elapsed * acceleration`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RainClock {
    pub active: bool,
    pub elapsed: f64,
    pub acceleration: f64,
}

impl RainClock {
    pub fn new(acceleration: f64) -> Self {
        Self { active: false, elapsed: 0.0, acceleration }
    }

    /// Accumulate wall time; only counts while rain is active.
    pub fn advance(&mut self, wall_dt: f64) {
        if self.active {
            self.elapsed += wall_dt;
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn simulated_seconds(&self) -> f64 {
        self.elapsed * self.acceleration
    }

    pub fn simulated_hours(&self) -> f64 {
        self.simulated_seconds() / 3600.0
    }
}

/// Intermediate infiltration quantities during a storm.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Infiltration {
    depth_m: f64,
    ru_increase: f64,
    hours: f64,
}

fn infiltration(env: &EnvironmentParams, clock: &RainClock) -> Infiltration {
    let intensity_m_hr = env.rain_intensity / 1000.0;
    let conductivity_m_hr = env.hydraulic_conductivity * 3600.0;
    let rate = intensity_m_hr.min(conductivity_m_hr);
    let hours = clock.simulated_hours();
    let depth_m = rate * hours;

    let permeability = (1.0 / (conductivity_m_hr * 100.0 + 0.01)).clamp(0.5, 2.0);
    let storage = env.soil_depth * POROSITY;
    let raw = depth_m / storage * permeability * INFILTRATION_GAIN;
    // Zero soil depth gives an unbounded rise; the clamp takes it to the cap.
    let ru_increase = if raw.is_nan() { 0.0 } else { raw.min(MAX_RU_INCREASE) };

    Infiltration { depth_m, ru_increase, hours }
}

/// Pore-pressure ratio for the current moisture, erosion and rain state.
pub fn pore_ratio(env: &EnvironmentParams, clock: &RainClock) -> f64 {
    if !clock.active {
        return env.moisture + DRY_EROSION_RU * env.erosion;
    }
    let inf = infiltration(env, clock);
    (env.moisture + inf.ru_increase + WET_EROSION_RU * env.erosion).min(MAX_RU)
}

/// Cohesion reinforced by roots and degraded by erosion (kPa).
pub fn effective_cohesion(env: &EnvironmentParams) -> f64 {
    let reinforced = env.cohesion * (1.0 + VEGETATION_COHESION_GAIN * env.vegetation);
    (reinforced * (1.0 - EROSION_COHESION_LOSS * env.erosion)).max(MIN_COHESION)
}

/// Friction angle including the vegetation contribution (degrees).
pub fn effective_friction(env: &EnvironmentParams) -> f64 {
    env.friction_angle + VEGETATION_FRICTION_GAIN * env.vegetation
}

/// Infinite-slope factor of safety using `env.ru`.
///
/// Returns [`FOS_SENTINEL`] for a flat slope, otherwise a value in `[0, FOS_MAX]`.
pub fn factor_of_safety(env: &EnvironmentParams) -> f64 {
    let z = env.soil_depth;
    let gamma = env.unit_weight;
    let c = effective_cohesion(env);
    let phi = effective_friction(env).to_radians();
    let beta = env.slope_angle.to_radians();

    let pore_pressure = env.ru * GAMMA_W * z;
    let normal_stress = gamma * z * beta.cos().powi(2);
    let effective_stress = (normal_stress - pore_pressure).max(0.0);
    let shear_strength = c + effective_stress * phi.tan();
    let driving_stress = gamma * z * beta.sin() * beta.cos();

    if driving_stress.abs() < FLAT_DRIVING_STRESS {
        return FOS_SENTINEL;
    }

    (shear_strength / driving_stress).clamp(0.0, FOS_MAX)
}

/// Abramowitz-Stegun 7.1.26 approximation of the error function.
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Normal CDF at `x` for the given mean and standard deviation.
pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (std_dev * std::f64::consts::SQRT_2)))
}

/// Probability that the true FoS falls below 1, treating FoS as normal with
/// standard deviation `cov * fos`.
pub fn probability_of_failure(fos: f64, cov: f64) -> f64 {
    if fos <= 0.0 || !fos.is_finite() {
        return 1.0;
    }
    let std_dev = cov * fos;
    if !(std_dev > 0.0) {
        return if fos < FOS_FAILURE { 1.0 } else { 0.0 };
    }
    normal_cdf(FOS_FAILURE, fos, std_dev).clamp(0.0, 1.0)
}

/// Qualitative stability classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// FoS >= 1.5 and PoF < 5%
    Stable,
    /// FoS >= 1.2 and PoF < 20%
    Caution,
    /// FoS >= 1.0 and PoF < 50%
    Unstable,
    /// Anything worse
    Failing,
}

impl RiskLevel {
    pub fn classify(fos: f64, pof: f64) -> Self {
        if fos >= 1.5 && pof < 0.05 {
            Self::Stable
        } else if fos >= 1.2 && pof < 0.20 {
            Self::Caution
        } else if fos >= 1.0 && pof < 0.50 {
            Self::Unstable
        } else {
            Self::Failing
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Stable => "Safe - acceptable",
            Self::Caution => "Marginal - monitor",
            Self::Unstable => "Critical - unstable",
            Self::Failing => "Failure imminent",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Caution => write!(f, "caution"),
            Self::Unstable => write!(f, "unstable"),
            Self::Failing => write!(f, "failing"),
        }
    }
}

/// Storm diagnostics for display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RainReport {
    /// Simulated storm duration (minutes)
    pub simulated_minutes: f64,
    /// Water that has soaked in (mm), capped by the soil's conductivity
    pub infiltration_mm: f64,
    /// Average rise of ru per simulated hour
    pub ru_rate_per_hour: f64,
    /// Gross rain fallen at the current intensity (mm), runoff included
    pub rainfall_mm: f64,
}

/// Result of one risk evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub fos: f64,
    pub pof: f64,
    pub ru: f64,
    pub effective_cohesion: f64,
    pub effective_friction: f64,
    pub level: RiskLevel,
    pub rain: Option<RainReport>,
}

impl RiskSnapshot {
    /// Risk high enough to start a slide on its own.
    pub fn is_elevated(&self) -> bool {
        self.fos < FOS_FAILURE || self.pof > 0.5
    }
}

/// Evaluate the full formula chain for an environment and rain state.
pub fn assess(env: &EnvironmentParams, clock: &RainClock) -> RiskSnapshot {
    let ru = pore_ratio(env, clock);
    let env = env.with_pore_ratio(ru);
    let fos = factor_of_safety(&env);
    let pof = probability_of_failure(fos, env.fos_cov);

    let rain = clock.active.then(|| {
        let inf = infiltration(&env, clock);
        RainReport {
            simulated_minutes: inf.hours * 60.0,
            infiltration_mm: inf.depth_m * 1000.0,
            ru_rate_per_hour: if inf.hours > 0.0 { inf.ru_increase / inf.hours } else { 0.0 },
            rainfall_mm: env.rain_intensity * inf.hours,
        }
    });

    RiskSnapshot {
        fos,
        pof,
        ru,
        effective_cohesion: effective_cohesion(&env),
        effective_friction: effective_friction(&env),
        level: RiskLevel::classify(fos, pof),
        rain,
    }
}
