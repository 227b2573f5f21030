//! Equations of motion in the inertial frame around a spinning body.

use crate::physics::gravity::GravityModel;
use crate::rotation::RotationModel;
use crate::types::{State, StateDerivative};

/// State derivative for the integrator.
///
/// Holds only shared references to immutable configuration, so evaluating it
/// for rejected trial steps or from several threads has no side effects.
pub struct EquationsOfMotion<'a, G: GravityModel + ?Sized> {
    rotation: &'a RotationModel,
    gravity: &'a G,
}

impl<G: GravityModel + ?Sized> Clone for EquationsOfMotion<'_, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: GravityModel + ?Sized> Copy for EquationsOfMotion<'_, G> {}

impl<'a, G: GravityModel + ?Sized> EquationsOfMotion<'a, G> {
    pub fn new(rotation: &'a RotationModel, gravity: &'a G) -> Self {
        Self { rotation, gravity }
    }

    /// Compute `[velocity, acceleration]` at time `t`.
    ///
    /// The inertial position is rotated into the body-fixed frame, the
    /// gravity model is evaluated there, and the acceleration is rotated back.
    #[inline]
    pub fn compute_motion(&self, t: f64, state: &State) -> StateDerivative {
        let body_position = self.rotation.to_body_frame(t, state.position);
        let body_acceleration = self.gravity.acceleration(body_position);
        let acceleration = self.rotation.to_inertial_frame(t, body_acceleration);

        StateDerivative::new(state.velocity, acceleration)
    }
}
