//! Toss - trajectory propagation around spinning irregular bodies
//!
//! Propagates satellite trajectories in the gravity field of an asteroid or
//! comet described by a closed surface mesh, detects passes through a
//! spherical risk zone, classifies them against the mesh, and scores
//! candidate initial states for a global optimizer.

pub mod collision;
pub mod config;
pub mod elements;
pub mod fitness;
pub mod mesh;
pub mod physics;
pub mod rotation;
pub mod trajectory;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use collision::{COLLISION_PENALTY, CollisionVerdict, point_is_outside_mesh};
pub use config::{BodyParameters, ConfigError, IntegrationConfig};
pub use elements::{ElementsError, OrbitalElements};
pub use fitness::{Bounds, DecisionVector, FitnessError, FitnessEvaluator, WORST_CASE_FITNESS};
pub use mesh::{Mesh, MeshError};
pub use physics::{
    EquationsOfMotion, GravityModel, IntegrationError, IntegrationScheme, MasconGravity,
    PointMassGravity, RiskZoneDetector, RiskZoneEvent,
};
pub use rotation::RotationModel;
pub use trajectory::{Trajectory, TrajectoryEngine, TrajectoryReport};
pub use types::State;
