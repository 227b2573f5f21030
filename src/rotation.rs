//! Spin kinematics of the central body.
//!
//! The body spins at a constant rate about a fixed axis. The axis is derived
//! once from the declination δ and right ascension α: the nominal z unit
//! vector is rotated about the inertial x-axis by δ, then about the inertial
//! z-axis by α.
//!
//! Sign convention: the body turns by `+ω·t` in the inertial frame, so the
//! inertial → body-fixed transform at time `t` is a rotation by `-ω·t` about
//! the spin axis. [`RotationModel::rotate_point`] applies exactly that, and
//! calling it with `-t` undoes it.

use std::f64::consts::TAU;

use bevy::math::{DMat3, DQuat, DVec3};

use crate::config::BodyParameters;
use crate::types::DEG_TO_RAD;

/// Constant-rate spin about a fixed axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationModel {
    spin_axis: DVec3,
    spin_rate: f64,
}

impl RotationModel {
    /// Build the model from the body's spin-axis orientation and period.
    ///
    /// The period is assumed to be validated (positive) by the caller.
    pub fn new(body: &BodyParameters) -> Self {
        let declination = DQuat::from_rotation_x(body.declination_deg * DEG_TO_RAD);
        let right_ascension = DQuat::from_rotation_z(body.right_ascension_deg * DEG_TO_RAD);
        // Quaternion products apply right to left: declination first.
        let axis_rotation = right_ascension * declination;

        Self {
            spin_axis: (axis_rotation * DVec3::Z).normalize(),
            spin_rate: TAU / body.spin_period,
        }
    }

    /// Unit spin axis in the inertial frame.
    pub fn spin_axis(&self) -> DVec3 {
        self.spin_axis
    }

    /// Spin rate ω in radians per second.
    pub fn spin_rate(&self) -> f64 {
        self.spin_rate
    }

    /// Rotation angle applied by [`Self::rotate_point`] at time `t`.
    pub fn angle_at(&self, t: f64) -> f64 {
        -self.spin_rate * t
    }

    /// Rotate `x` about the spin axis by `-ω·t`.
    ///
    /// `rotate_point(t, x)` maps inertial → body-fixed coordinates and
    /// `rotate_point(-t, x)` maps them back. At `t == 0` the input is
    /// returned unchanged.
    #[inline]
    pub fn rotate_point(&self, t: f64, x: DVec3) -> DVec3 {
        if t == 0.0 {
            return x;
        }
        DQuat::from_axis_angle(self.spin_axis, self.angle_at(t)) * x
    }

    /// Inertial → body-fixed frame.
    #[inline]
    pub fn to_body_frame(&self, t: f64, inertial: DVec3) -> DVec3 {
        self.rotate_point(t, inertial)
    }

    /// Body-fixed → inertial frame.
    #[inline]
    pub fn to_inertial_frame(&self, t: f64, body_fixed: DVec3) -> DVec3 {
        self.rotate_point(-t, body_fixed)
    }

    /// Closed-form Euler–Rodrigues matrix of the same rotation as
    /// [`Self::rotate_point`] at time `t`.
    pub fn rotation_matrix(&self, t: f64) -> DMat3 {
        let half = 0.5 * self.angle_at(t);
        let a = half.cos();
        let [b, c, d] = (self.spin_axis * half.sin()).to_array();

        let (aa, bb, cc, dd) = (a * a, b * b, c * c, d * d);
        let (bc, ad, ac, ab, bd, cd) = (b * c, a * d, a * c, a * b, b * d, c * d);

        let rows = [
            [aa + bb - cc - dd, 2.0 * (bc - ad), 2.0 * (bd + ac)],
            [2.0 * (bc + ad), aa + cc - bb - dd, 2.0 * (cd - ab)],
            [2.0 * (bd - ac), 2.0 * (cd + ab), aa + dd - bb - cc],
        ];
        // `from_cols_array_2d` reads columns, so the row layout is transposed.
        DMat3::from_cols_array_2d(&rows).transpose()
    }
}
