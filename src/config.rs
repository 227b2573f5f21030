//! Body and integration configuration.
//!
//! All preconditions are checked once, when an engine or evaluator is built.
//! A failed check is returned as a [`ConfigError`] and the object is never
//! constructed, so an invalid configuration can not reach the integrator.

use crate::mesh::MeshError;
use crate::physics::{IntegrationScheme, IntegratorConfig};
use crate::types::SECONDS_PER_HOUR;

/// Construction-time precondition failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("body density must be positive, got {0}")]
    NonPositiveDensity(f64),

    #[error("spin period must be positive, got {0}")]
    NonPositiveSpinPeriod(f64),

    #[error("final time {end} must be greater than start time {start}")]
    InvalidTimeSpan { start: f64, end: f64 },

    #[error("start time {start} and final time {end} must be finite")]
    NonFiniteTimeSpan { start: f64, end: f64 },

    #[error("time step must be positive, got {0}")]
    NonPositiveTimeStep(f64),

    #[error("time step {step} exceeds the integration span {span}")]
    TimeStepTooLarge { step: f64, span: f64 },

    #[error("tolerances must be positive (atol = {atol}, rtol = {rtol})")]
    NonPositiveTolerance { atol: f64, rtol: f64 },

    #[error("risk zone radius {radius} must exceed the largest protuberance {protuberance}")]
    RiskZoneTooSmall { radius: f64, protuberance: f64 },

    #[error("max_steps must be at least 1")]
    ZeroStepLimit,

    #[error("minimum step must be positive and finite, got {0}")]
    InvalidMinStep(f64),

    #[error("unknown integration scheme index {0}")]
    UnknownScheme(u32),

    #[error("bounds have different lengths (lower: {lower}, upper: {upper})")]
    BoundsLengthMismatch { lower: usize, upper: usize },

    #[error("bounds must have {expected} entries, got {got}")]
    BoundsDimension { expected: usize, got: usize },

    #[error("lower bound {lower} is not below upper bound {upper} at index {index}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),
}

/// Physical description of the spinning body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyParameters {
    /// Mass density (kg/m³)
    pub density: f64,
    /// Gravitational parameter μ (m³/s²), used to map orbital elements to states
    pub mu: f64,
    /// Declination of the spin axis in degrees
    pub declination_deg: f64,
    /// Right ascension of the spin axis in degrees
    pub right_ascension_deg: f64,
    /// Sidereal spin period in seconds
    pub spin_period: f64,
}

impl BodyParameters {
    /// Comet 67P/Churyumov–Gerasimenko.
    ///
    /// Values from ESA's Rosetta mission fact sheet.
    pub fn comet_67p() -> Self {
        Self {
            density: 533.0,
            mu: 665.666,
            declination_deg: 64.0,
            right_ascension_deg: 69.0,
            spin_period: 12.06 * SECONDS_PER_HOUR,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.density > 0.0) {
            return Err(ConfigError::NonPositiveDensity(self.density));
        }
        if !(self.spin_period > 0.0) {
            return Err(ConfigError::NonPositiveSpinPeriod(self.spin_period));
        }
        Ok(())
    }
}

/// Configuration of one trajectory integration run.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegrationConfig {
    /// Start time in seconds (often zero)
    pub start_time: f64,
    /// Final time in seconds
    pub final_time: f64,
    /// Nominal step in seconds. Used as the first trial step and as the
    /// upper bound for adaptive steps.
    pub time_step: f64,
    /// Embedded Runge-Kutta pair driving the adaptive integrator.
    /// Low-order pairs need looser tolerances than the default, see
    /// [`IntegrationScheme::HeunEuler`].
    pub scheme: IntegrationScheme,
    /// Absolute error tolerance. Default: 1e-12.
    pub atol: f64,
    /// Relative error tolerance. Default: 1e-12.
    pub rtol: f64,
    /// Radius of the bounding sphere ("risk zone") around the body
    pub risk_zone_radius: f64,
    /// Maximum number of attempted steps before the run is abandoned
    pub max_steps: usize,
    /// Smallest step the controller may shrink to before giving up
    pub min_step: f64,
    /// Dense-output points sampled inside each step that touches the risk zone
    pub dense_samples_per_step: usize,
    /// Stop integrating at the first risk zone event instead of running to `final_time`
    pub stop_at_risk_zone: bool,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            final_time: 86400.0, // 1 day
            time_step: 600.0,    // 10 minutes
            scheme: IntegrationScheme::default(),
            atol: 1e-12,
            rtol: 1e-12,
            risk_zone_radius: 4000.0,
            max_steps: 1_000_000,
            min_step: 1e-9,
            dense_samples_per_step: 4,
            stop_at_risk_zone: false,
        }
    }
}

impl IntegrationConfig {
    /// Length of the integration span in seconds.
    pub fn span(&self) -> f64 {
        self.final_time - self.start_time
    }

    /// Check every precondition against the mesh's largest protuberance.
    pub fn validate(&self, largest_protuberance: f64) -> Result<(), ConfigError> {
        if !(self.start_time.is_finite() && self.final_time.is_finite()) {
            return Err(ConfigError::NonFiniteTimeSpan {
                start: self.start_time,
                end: self.final_time,
            });
        }
        if !(self.final_time > self.start_time) {
            return Err(ConfigError::InvalidTimeSpan {
                start: self.start_time,
                end: self.final_time,
            });
        }
        if !(self.time_step > 0.0) {
            return Err(ConfigError::NonPositiveTimeStep(self.time_step));
        }
        if self.time_step > self.span() {
            return Err(ConfigError::TimeStepTooLarge {
                step: self.time_step,
                span: self.span(),
            });
        }
        if !(self.atol > 0.0 && self.rtol > 0.0) {
            return Err(ConfigError::NonPositiveTolerance {
                atol: self.atol,
                rtol: self.rtol,
            });
        }
        if !(self.risk_zone_radius > largest_protuberance) {
            return Err(ConfigError::RiskZoneTooSmall {
                radius: self.risk_zone_radius,
                protuberance: largest_protuberance,
            });
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroStepLimit);
        }
        if !(self.min_step > 0.0 && self.min_step.is_finite()) {
            return Err(ConfigError::InvalidMinStep(self.min_step));
        }
        Ok(())
    }

    /// Step controller settings derived from this run configuration.
    pub fn integrator_config(&self) -> IntegratorConfig {
        IntegratorConfig {
            initial_dt: self.time_step,
            max_dt: self.time_step,
            min_dt: self.min_step.min(self.time_step),
            atol: self.atol,
            rtol: self.rtol,
            max_steps: self.max_steps,
            ..Default::default()
        }
    }
}
