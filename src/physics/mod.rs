//! Physics layer for trajectory propagation.
//!
//! Gravity models are evaluated in the body-fixed frame, the equations of
//! motion wrap them for the inertial frame, and the adaptive integrator
//! advances the state while an event function watches the risk zone.

mod equations;
mod events;
mod gravity;
mod integrator;

#[cfg(test)]
mod proptest_physics;

pub use equations::EquationsOfMotion;
pub use events::{EventFunction, EventRecord, NoEvents, RiskZoneDetector, RiskZoneEvent};
pub use gravity::{GravityModel, MasconGravity, PointMassGravity};
pub use integrator::{
    AdaptiveIntegrator, ButcherTableau, IntegrationError, IntegrationOutput, IntegrationScheme,
    IntegrationStats, IntegratorConfig, Sample, hermite,
};
