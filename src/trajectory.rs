//! Trajectory propagation around the spinning body.
//!
//! [`TrajectoryEngine`] owns the validated configuration of one body and
//! runs complete integrations: the adaptive integrator records every accepted
//! step and every risk zone point, including passes that start and end
//! inside one step, and at the end of the run the recorded points are
//! classified against the surface mesh.

use bevy::log::debug;
use bevy::math::DVec3;

use crate::collision::CollisionVerdict;
use crate::config::{BodyParameters, ConfigError, IntegrationConfig};
use crate::mesh::Mesh;
use crate::physics::{
    AdaptiveIntegrator, EquationsOfMotion, GravityModel, IntegrationError, IntegrationStats,
    MasconGravity, RiskZoneDetector, RiskZoneEvent, Sample, hermite,
};
use crate::rotation::RotationModel;
use crate::types::State;

// =============================================================================
// Trajectory
// =============================================================================

/// Accepted integration steps of one run, with cubic Hermite dense output.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    /// Samples must be ordered by strictly increasing time.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.samples.first().map(|s| s.time)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.samples.last().map(|s| s.time)
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.time)
    }

    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.samples.iter().map(|s| &s.state)
    }

    /// Inertial positions, e.g. for external plotting.
    pub fn positions(&self) -> Vec<DVec3> {
        self.samples.iter().map(|s| s.state.position).collect()
    }

    pub fn final_state(&self) -> Option<&State> {
        self.samples.last().map(|s| &s.state)
    }

    /// Dense-output state at `t`, or `None` outside the integrated span.
    ///
    /// Exact at the samples; in between, position and velocity are each
    /// interpolated by a cubic Hermite polynomial using the stored
    /// derivatives.
    pub fn interpolate(&self, t: f64) -> Option<State> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if !(t >= first.time && t <= last.time) {
            return None;
        }

        let next = self.samples.partition_point(|s| s.time <= t);
        if next == self.samples.len() {
            return Some(last.state);
        }
        Some(hermite(&self.samples[next - 1], &self.samples[next], t))
    }
}

// =============================================================================
// Report
// =============================================================================

/// Point handed to the collision classifier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidatePoint {
    pub time: f64,
    /// Inertial position
    pub position: DVec3,
    /// Same point in the body-fixed frame at `time`
    pub body_position: DVec3,
}

/// Everything one run produced.
#[derive(Clone, Debug)]
pub struct TrajectoryReport {
    pub trajectory: Trajectory,
    /// `|position|²` per sample
    pub squared_altitudes: Vec<f64>,
    /// Samples strictly inside the risk zone, and entry and deepest points
    /// of passes between two samples outside it
    pub events: Vec<RiskZoneEvent>,
    /// Event positions plus dense-output points inside the risk zone on
    /// steps holding an event, by time
    pub candidate_points: Vec<CandidatePoint>,
    pub verdict: CollisionVerdict,
    /// The run ended at the first risk zone event
    pub stopped_at_risk_zone: bool,
    pub stats: IntegrationStats,
}

impl TrajectoryReport {
    pub fn is_collision(&self) -> bool {
        self.verdict.collision()
    }

    /// `COLLISION_PENALTY` on collision, otherwise exactly `0.0`.
    pub fn collision_penalty(&self) -> f64 {
        self.verdict.penalty()
    }

    pub fn final_state(&self) -> Option<&State> {
        self.trajectory.final_state()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Propagates satellite trajectories around one body.
///
/// All inputs are validated in [`TrajectoryEngine::new`]; the engine itself
/// is immutable, so one instance can serve many runs and threads.
#[derive(Clone, Debug)]
pub struct TrajectoryEngine<G: GravityModel = MasconGravity> {
    mesh: Mesh,
    gravity: G,
    body: BodyParameters,
    rotation: RotationModel,
    config: IntegrationConfig,
}

impl TrajectoryEngine<MasconGravity> {
    /// Engine using the mascon field of `mesh` at the body's density.
    pub fn with_mascon_gravity(
        mesh: Mesh,
        body: BodyParameters,
        config: IntegrationConfig,
    ) -> Result<Self, ConfigError> {
        body.validate()?;
        let gravity = MasconGravity::from_mesh(&mesh, body.density);
        Self::new(mesh, gravity, body, config)
    }
}

impl<G: GravityModel> TrajectoryEngine<G> {
    pub fn new(
        mesh: Mesh,
        gravity: G,
        body: BodyParameters,
        config: IntegrationConfig,
    ) -> Result<Self, ConfigError> {
        body.validate()?;
        config.validate(mesh.largest_protuberance())?;

        let rotation = RotationModel::new(&body);
        debug!(
            "Trajectory engine ready: {} vertices, {} faces, protuberance {:.3}, risk zone {:.3}, {} over [{}, {}]",
            mesh.n_vertices(),
            mesh.n_faces(),
            mesh.largest_protuberance(),
            config.risk_zone_radius,
            config.scheme,
            config.start_time,
            config.final_time
        );

        Ok(Self {
            mesh,
            gravity,
            body,
            rotation,
            config,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn gravity(&self) -> &G {
        &self.gravity
    }

    pub fn body(&self) -> &BodyParameters {
        &self.body
    }

    pub fn rotation(&self) -> &RotationModel {
        &self.rotation
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Event descriptor handed to the integrator for each run.
    pub fn risk_zone(&self) -> RiskZoneDetector {
        if self.config.stop_at_risk_zone {
            RiskZoneDetector::terminal(self.config.risk_zone_radius)
        } else {
            RiskZoneDetector::new(self.config.risk_zone_radius)
        }
    }

    pub fn equations_of_motion(&self) -> EquationsOfMotion<'_, G> {
        EquationsOfMotion::new(&self.rotation, &self.gravity)
    }

    /// Integrate from `initial` (inertial frame, at `start_time`) to
    /// `final_time` and classify every risk zone point.
    pub fn integrate(&self, initial: State) -> Result<TrajectoryReport, IntegrationError> {
        let equations = self.equations_of_motion();
        let detector = self.risk_zone();
        let integrator = AdaptiveIntegrator::new(self.config.scheme, self.config.integrator_config());

        let output = integrator.integrate(
            |t, state| equations.compute_motion(t, state),
            self.config.start_time,
            initial,
            self.config.final_time,
            &detector,
        )?;

        let trajectory = Trajectory::new(output.samples);
        let squared_altitudes = trajectory
            .states()
            .map(State::squared_altitude)
            .collect();

        let candidate_points = self.candidate_points(&trajectory, &output.events, &detector);
        let body_positions: Vec<DVec3> = candidate_points.iter().map(|c| c.body_position).collect();
        let verdict = CollisionVerdict::classify(&body_positions, &self.mesh);

        if verdict.collision() {
            debug!(
                "Collision: {} of {} candidate points inside the body",
                verdict.outside.iter().filter(|&&outside| !outside).count(),
                verdict.candidates()
            );
        } else if !output.events.is_empty() {
            debug!(
                "{} risk zone events, {} candidate points, no collision",
                output.events.len(),
                verdict.candidates()
            );
        }

        Ok(TrajectoryReport {
            trajectory,
            squared_altitudes,
            events: output.events,
            candidate_points,
            verdict,
            stopped_at_risk_zone: output.stopped_by_event,
            stats: output.stats,
        })
    }

    /// Event positions plus dense-output points inside the zone on every
    /// step that holds a recorded event, sorted by time.
    ///
    /// Without events there are no candidates, so the classifier is never
    /// consulted for a run that stayed outside the zone.
    fn candidate_points(
        &self,
        trajectory: &Trajectory,
        events: &[RiskZoneEvent],
        detector: &RiskZoneDetector,
    ) -> Vec<CandidatePoint> {
        let mut candidates: Vec<CandidatePoint> = events
            .iter()
            .map(|event| self.candidate(event.time, event.position()))
            .collect();

        let dense = self.config.dense_samples_per_step;
        if dense > 0 && !events.is_empty() {
            for pair in trajectory.samples().windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let first = events.partition_point(|event| event.time < a.time);
                if !events.get(first).is_some_and(|event| event.time <= b.time) {
                    continue;
                }
                for k in 1..=dense {
                    let t = a.time + (b.time - a.time) * k as f64 / (dense + 1) as f64;
                    let state = hermite(a, b, t);
                    if detector.is_inside(&state) {
                        candidates.push(self.candidate(t, state.position));
                    }
                }
            }
        }

        candidates.sort_by(|a, b| a.time.total_cmp(&b.time));
        candidates
    }

    fn candidate(&self, time: f64, position: DVec3) -> CandidatePoint {
        CandidatePoint {
            time,
            position,
            body_position: self.rotation.to_body_frame(time, position),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
