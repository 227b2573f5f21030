//! Toss - trajectory propagation demo
//!
//! Runs a headless app that propagates two trajectories around a
//! comet-sized body and logs the fitness and collision verdicts.

use std::f64::consts::{PI, TAU};

use bevy::log::LogPlugin;
use bevy::math::DVec3;
use bevy::prelude::*;

use toss::{
    BodyParameters, Bounds, DecisionVector, FitnessEvaluator, IntegrationConfig, Mesh, State,
    TrajectoryEngine,
};

/// Mean radius of the demo body in meters.
const BODY_RADIUS: f64 = 2000.0;

fn main() {
    let mut app = App::new();
    app.add_plugins(LogPlugin::default())
        .add_systems(Startup, run_demo);
    app.update();
}

fn run_demo() {
    let body = BodyParameters::comet_67p();
    let config = IntegrationConfig {
        final_time: 12.0 * 3600.0,
        risk_zone_radius: 2.0 * BODY_RADIUS,
        ..Default::default()
    };

    let engine = match TrajectoryEngine::with_mascon_gravity(
        Mesh::icosphere(BODY_RADIUS, 2),
        body,
        config,
    ) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Invalid demo configuration: {err}");
            return;
        }
    };
    let mu = engine.gravity().total_gm();
    info!(
        "Body: {} faces, GM = {:.3} m³/s², spin period {:.2} h",
        engine.mesh().n_faces(),
        mu,
        engine.body().spin_period / 3600.0
    );

    // Straight at the body: must be classified as a collision
    let impactor = State::new(DVec3::new(6000.0, 0.0, 0.0), DVec3::new(-0.5, 0.0, 0.0));
    match engine.integrate(impactor) {
        Ok(report) => info!(
            "Impactor: {} steps, {} risk zone events, collision = {}",
            report.trajectory.len(),
            report.events.len(),
            report.is_collision()
        ),
        Err(err) => warn!("Impactor run failed: {err}"),
    }

    let bounds = match Bounds::new(
        vec![4000.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        vec![8000.0, 0.3, PI, TAU, TAU, TAU],
    ) {
        Ok(bounds) => bounds,
        Err(err) => {
            error!("Invalid bounds: {err}");
            return;
        }
    };
    let evaluator = match FitnessEvaluator::new(
        engine,
        DecisionVector::OrbitalElements { mu },
        6000.0,
        bounds,
    ) {
        Ok(evaluator) => evaluator,
        Err(err) => {
            error!("Invalid evaluator: {err}");
            return;
        }
    };

    let population = [
        [6000.0, 0.0, 0.5, 0.0, 0.0, 0.0],
        [5000.0, 0.1, 1.0, 1.0, 0.5, 2.0],
        [7500.0, 0.25, 0.2, 3.0, 1.0, 4.0],
    ];
    let flat: Vec<f64> = population.iter().flatten().copied().collect();
    match evaluator.batch_fitness(&flat) {
        Ok(values) => {
            for (x, value) in population.iter().zip(values) {
                info!("fitness({x:?}) = {value:.6e}");
            }
        }
        Err(err) => warn!("Batch evaluation failed: {err}"),
    }
}
