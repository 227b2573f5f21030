//! Osculating orbital elements to Cartesian state conversion.

use bevy::math::{DQuat, DVec3};

use crate::types::{STATE_DIM, State};

/// Elements outside the elliptic domain.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ElementsError {
    #[error("orbital elements must be finite")]
    NonFinite,

    #[error("semi-major axis must be positive, got {0}")]
    NonPositiveSemiMajorAxis(f64),

    #[error("eccentricity must be in [0, 1), got {0}")]
    UnsupportedEccentricity(f64),

    #[error("gravitational parameter must be positive, got {0}")]
    NonPositiveMu(f64),
}

/// Keplerian elements of an elliptic orbit.
/// All angular values in radians, distances in meters.
///
/// Vector layout `[a, e, i, Ω, ω, E]` matches pykep's `par2ic`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitalElements {
    /// Semi-major axis
    pub semi_major_axis: f64,
    /// Eccentricity (0 ≤ e < 1)
    pub eccentricity: f64,
    /// Inclination
    pub inclination: f64,
    /// Right ascension of the ascending node Ω
    pub raan: f64,
    /// Argument of periapsis ω
    pub argument_of_periapsis: f64,
    /// Eccentric anomaly E
    pub eccentric_anomaly: f64,
}

impl OrbitalElements {
    pub fn from_array(values: [f64; STATE_DIM]) -> Self {
        Self {
            semi_major_axis: values[0],
            eccentricity: values[1],
            inclination: values[2],
            raan: values[3],
            argument_of_periapsis: values[4],
            eccentric_anomaly: values[5],
        }
    }

    /// `None` unless `values` has exactly six entries.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let values: [f64; STATE_DIM] = values.try_into().ok()?;
        Some(Self::from_array(values))
    }

    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.semi_major_axis,
            self.eccentricity,
            self.inclination,
            self.raan,
            self.argument_of_periapsis,
            self.eccentric_anomaly,
        ]
    }

    pub fn validate(&self, mu: f64) -> Result<(), ElementsError> {
        if !self.to_array().iter().all(|v| v.is_finite()) {
            return Err(ElementsError::NonFinite);
        }
        if !(self.semi_major_axis > 0.0) {
            return Err(ElementsError::NonPositiveSemiMajorAxis(self.semi_major_axis));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(ElementsError::UnsupportedEccentricity(self.eccentricity));
        }
        if !(mu > 0.0) {
            return Err(ElementsError::NonPositiveMu(mu));
        }
        Ok(())
    }

    /// Radius at the current eccentric anomaly: r = a(1 - e cos E).
    pub fn radius(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentric_anomaly.cos())
    }

    /// Rotation from the perifocal frame to the inertial frame, R3(Ω)·R1(i)·R3(ω).
    pub fn perifocal_rotation(&self) -> DQuat {
        DQuat::from_rotation_z(self.raan)
            * DQuat::from_rotation_x(self.inclination)
            * DQuat::from_rotation_z(self.argument_of_periapsis)
    }

    /// Cartesian position and velocity around a body with parameter `mu`.
    pub fn to_cartesian(&self, mu: f64) -> Result<State, ElementsError> {
        self.validate(mu)?;

        let a = self.semi_major_axis;
        let e = self.eccentricity;
        let (sin_e, cos_e) = self.eccentric_anomaly.sin_cos();
        let b_over_a = (1.0 - e * e).sqrt();

        let position = DVec3::new(a * (cos_e - e), a * b_over_a * sin_e, 0.0);
        let speed_factor = (mu / a).sqrt() / (1.0 - e * cos_e);
        let velocity = DVec3::new(-sin_e, b_over_a * cos_e, 0.0) * speed_factor;

        let rotation = self.perifocal_rotation();
        Ok(State::new(rotation * position, rotation * velocity))
    }
}
