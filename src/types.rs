//! Core state types and constants for trajectory propagation.

use std::ops::{Add, Mul};

use bevy::math::DVec3;

/// Physical constants (SI units)

/// Gravitational constant (m³·kg⁻¹·s⁻²)
pub const G: f64 = 6.67430e-11;

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Seconds per hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Number of scalar components in a [`State`].
pub const STATE_DIM: usize = 6;

/// Satellite state in the inertial frame.
///
/// Uses f64 (DVec3) throughout; positions are in mesh units (meters for the
/// bundled presets) and velocities in mesh units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct State {
    /// Position relative to the body's reference origin
    pub position: DVec3,
    /// Velocity
    pub velocity: DVec3,
}

impl State {
    /// Create a new state
    pub fn new(position: DVec3, velocity: DVec3) -> Self {
        Self { position, velocity }
    }

    /// Build a state from `[x, y, z, vx, vy, vz]`.
    pub fn from_array(values: [f64; STATE_DIM]) -> Self {
        Self {
            position: DVec3::new(values[0], values[1], values[2]),
            velocity: DVec3::new(values[3], values[4], values[5]),
        }
    }

    /// Build a state from a slice, returning `None` unless it has exactly six entries.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let values: [f64; STATE_DIM] = values.try_into().ok()?;
        Some(Self::from_array(values))
    }

    /// Flatten to `[x, y, z, vx, vy, vz]`.
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
        ]
    }

    /// Advance the state along a derivative: `self + h * derivative`.
    #[inline]
    pub fn advanced(&self, derivative: &StateDerivative, h: f64) -> Self {
        Self {
            position: self.position + derivative.velocity * h,
            velocity: self.velocity + derivative.acceleration * h,
        }
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }

    /// Distance from the reference origin.
    pub fn altitude(&self) -> f64 {
        self.position.length()
    }

    /// Squared distance from the reference origin.
    pub fn squared_altitude(&self) -> f64 {
        self.position.length_squared()
    }
}

/// Time derivative of a [`State`]: `[velocity, acceleration]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateDerivative {
    pub velocity: DVec3,
    pub acceleration: DVec3,
}

impl StateDerivative {
    pub const ZERO: Self = Self {
        velocity: DVec3::ZERO,
        acceleration: DVec3::ZERO,
    };

    pub fn new(velocity: DVec3, acceleration: DVec3) -> Self {
        Self {
            velocity,
            acceleration,
        }
    }

    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.acceleration.x,
            self.acceleration.y,
            self.acceleration.z,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.velocity.is_finite() && self.acceleration.is_finite()
    }
}

impl Add for StateDerivative {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            velocity: self.velocity + rhs.velocity,
            acceleration: self.acceleration + rhs.acceleration,
        }
    }
}

impl Mul<f64> for StateDerivative {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            velocity: self.velocity * rhs,
            acceleration: self.acceleration * rhs,
        }
    }
}
