//! Fitness evaluation for a population-based optimizer.
//!
//! Exposes the user-defined-problem contract (`fitness`, `get_bounds`,
//! `batch_fitness`) over a [`TrajectoryEngine`]. A candidate is scored by how
//! closely its trajectory keeps the target altitude, plus the collision
//! penalty. Numerical failures never escape as panics: they are logged and
//! scored as [`WORST_CASE_FITNESS`].

use bevy::log::warn;
use rayon::prelude::*;

use crate::config::ConfigError;
use crate::elements::{ElementsError, OrbitalElements};
use crate::physics::{GravityModel, IntegrationError, MasconGravity};
use crate::trajectory::{TrajectoryEngine, TrajectoryReport};
use crate::types::{STATE_DIM, State};

/// Fitness assigned to candidates whose trajectory could not be computed.
pub const WORST_CASE_FITNESS: f64 = f64::MAX;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitnessError {
    #[error("decision vector must have {expected} entries, got {got}")]
    DecisionLength { expected: usize, got: usize },

    #[error("batch of {len} values is not a whole number of {dimension}-entry decision vectors")]
    BatchLength { len: usize, dimension: usize },

    #[error("invalid orbital elements: {0}")]
    Elements(#[from] ElementsError),

    #[error("integration failed: {0}")]
    Integration(#[from] IntegrationError),
}

/// Box constraints of the decision space.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, ConfigError> {
        if lower.len() != upper.len() {
            return Err(ConfigError::BoundsLengthMismatch {
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        if lower.is_empty() {
            return Err(ConfigError::BoundsDimension {
                expected: STATE_DIM,
                got: 0,
            });
        }
        for (index, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if !(lo < hi) {
                return Err(ConfigError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| lo <= v && v <= hi)
    }
}

/// How a decision vector maps to the initial state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecisionVector {
    /// `[x, y, z, vx, vy, vz]` in the inertial frame
    Cartesian,
    /// `[a, e, i, Ω, ω, E]` around a body with parameter `mu`
    OrbitalElements { mu: f64 },
}

impl DecisionVector {
    pub fn initial_state(&self, x: &[f64]) -> Result<State, FitnessError> {
        let length_error = || FitnessError::DecisionLength {
            expected: STATE_DIM,
            got: x.len(),
        };
        match *self {
            Self::Cartesian => State::from_slice(x).ok_or_else(length_error),
            Self::OrbitalElements { mu } => {
                let elements = OrbitalElements::from_slice(x).ok_or_else(length_error)?;
                Ok(elements.to_cartesian(mu)?)
            }
        }
    }
}

/// Single-objective fitness over initial states.
#[derive(Clone, Debug)]
pub struct FitnessEvaluator<G: GravityModel = MasconGravity> {
    engine: TrajectoryEngine<G>,
    decision: DecisionVector,
    target_altitude: f64,
    bounds: Bounds,
}

impl<G: GravityModel> FitnessEvaluator<G> {
    pub fn new(
        engine: TrajectoryEngine<G>,
        decision: DecisionVector,
        target_altitude: f64,
        bounds: Bounds,
    ) -> Result<Self, ConfigError> {
        if bounds.dimension() != STATE_DIM {
            return Err(ConfigError::BoundsDimension {
                expected: STATE_DIM,
                got: bounds.dimension(),
            });
        }
        Ok(Self {
            engine,
            decision,
            target_altitude,
            bounds,
        })
    }

    pub fn engine(&self) -> &TrajectoryEngine<G> {
        &self.engine
    }

    pub fn decision(&self) -> DecisionVector {
        self.decision
    }

    pub fn target_altitude(&self) -> f64 {
        self.target_altitude
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn get_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (self.bounds.lower.clone(), self.bounds.upper.clone())
    }

    /// Number of objectives.
    pub fn get_nobj(&self) -> usize {
        1
    }

    /// Run the trajectory for `x` and return the full report.
    pub fn evaluate(&self, x: &[f64]) -> Result<TrajectoryReport, FitnessError> {
        let initial = self.decision.initial_state(x)?;
        Ok(self.engine.integrate(initial)?)
    }

    /// Mean deviation of the squared altitude from the squared target, plus
    /// the collision penalty.
    pub fn objective(&self, report: &TrajectoryReport) -> f64 {
        let target_squared = self.target_altitude * self.target_altitude;
        let deviation = report
            .squared_altitudes
            .iter()
            .map(|r2| (r2 - target_squared).abs())
            .sum::<f64>()
            / report.squared_altitudes.len().max(1) as f64;

        let value = deviation + report.collision_penalty();
        if value.is_finite() {
            value
        } else {
            WORST_CASE_FITNESS
        }
    }

    /// Fitness vector (one objective) for decision vector `x`.
    ///
    /// Only a wrongly sized `x` is an error; a trajectory that can not be
    /// computed scores [`WORST_CASE_FITNESS`].
    pub fn fitness(&self, x: &[f64]) -> Result<Vec<f64>, FitnessError> {
        if x.len() != STATE_DIM {
            return Err(FitnessError::DecisionLength {
                expected: STATE_DIM,
                got: x.len(),
            });
        }

        match self.evaluate(x) {
            Ok(report) => Ok(vec![self.objective(&report)]),
            Err(err) => {
                warn!("Fitness evaluation failed for {x:?}: {err}");
                Ok(vec![WORST_CASE_FITNESS])
            }
        }
    }

    /// Fitness of many decision vectors concatenated into `xs`, evaluated
    /// in parallel. Results are in input order.
    pub fn batch_fitness(&self, xs: &[f64]) -> Result<Vec<f64>, FitnessError> {
        if xs.len() % STATE_DIM != 0 {
            return Err(FitnessError::BatchLength {
                len: xs.len(),
                dimension: STATE_DIM,
            });
        }

        let results: Vec<Vec<f64>> = xs
            .par_chunks(STATE_DIM)
            .map(|x| self.fitness(x))
            .collect::<Result<_, _>>()?;

        Ok(results.into_iter().flatten().collect())
    }
}
