//! Adaptive embedded Runge-Kutta integrators.
//!
//! Each scheme is an embedded pair: the higher-order solution is propagated
//! and the difference to the lower-order one drives the step size. Every
//! accepted step is kept together with its derivative, which is enough for
//! cubic Hermite dense output between steps.
//!
//! Event functions are checked on every accepted sample and, through the
//! dense output, between two samples at which they are clear, so a pass
//! through an event region inside a single step is still recorded.
//!
//! The integrator never loops unbounded: attempts are capped by
//! `max_steps`, and a step that has to shrink below `min_dt` (for example
//! because the field is singular ahead) ends the run with an error.

use bevy::log::debug;
use bevy::math::DVec3;
use wide::f64x4;

use crate::config::ConfigError;
use crate::physics::events::{EventFunction, EventRecord};
use crate::types::{STATE_DIM, State, StateDerivative};

// =============================================================================
// Configuration
// =============================================================================

/// Step controller configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegratorConfig {
    /// First trial step in seconds. Default: 60.
    pub initial_dt: f64,
    /// Largest allowed step in seconds. Default: unbounded.
    pub max_dt: f64,
    /// Smallest step before the run is abandoned. Default: 1e-9.
    pub min_dt: f64,
    /// Absolute error tolerance. Default: 1e-12.
    pub atol: f64,
    /// Relative error tolerance. Default: 1e-12.
    pub rtol: f64,
    /// Maximum number of attempted (accepted + rejected) steps. Default: 1 000 000.
    pub max_steps: usize,
    /// Safety factor for step changes. Default: 0.9.
    pub safety_factor: f64,
    /// Smallest step change factor. Default: 0.2.
    pub min_scale: f64,
    /// Largest step change factor. Default: 5.0.
    pub max_scale: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            initial_dt: 60.0,
            max_dt: f64::INFINITY,
            min_dt: 1e-9,
            atol: 1e-12,
            rtol: 1e-12,
            max_steps: 1_000_000,
            safety_factor: 0.9,
            min_scale: 0.2,
            max_scale: 5.0,
        }
    }
}

/// Shrink factor applied when a trial step produced a non-finite value.
const NON_FINITE_SHRINK: f64 = 0.25;

// =============================================================================
// Schemes
// =============================================================================

/// Butcher tableau of an embedded Runge-Kutta pair.
#[derive(Debug)]
pub struct ButcherTableau {
    /// Stage times
    pub c: &'static [f64],
    /// Stage coefficients, one row per stage (row 0 is empty)
    pub a: &'static [&'static [f64]],
    /// Weights of the propagated (higher-order) solution
    pub b: &'static [f64],
    /// Weights of the embedded (lower-order) solution
    pub b_low: &'static [f64],
    /// Order of the propagated solution
    pub order: u32,
    /// Order of the embedded solution, used for step control
    pub error_order: u32,
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.c.len()
    }
}

static HEUN_EULER: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0],
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
    b_low: &[1.0, 0.0],
    order: 2,
    error_order: 1,
};

static BOGACKI_SHAMPINE: ButcherTableau = ButcherTableau {
    c: &[0.0, 0.5, 0.75, 1.0],
    a: &[
        &[],
        &[0.5],
        &[0.0, 0.75],
        &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
    ],
    b: &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
    b_low: &[7.0 / 24.0, 0.25, 1.0 / 3.0, 0.125],
    order: 3,
    error_order: 2,
};

static FEHLBERG_45: ButcherTableau = ButcherTableau {
    c: &[0.0, 0.25, 3.0 / 8.0, 12.0 / 13.0, 1.0, 0.5],
    a: &[
        &[],
        &[0.25],
        &[3.0 / 32.0, 9.0 / 32.0],
        &[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
        &[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
        &[-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
    ],
    b: &[
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
    ],
    b_low: &[
        25.0 / 216.0,
        0.0,
        1408.0 / 2565.0,
        2197.0 / 4104.0,
        -0.2,
        0.0,
    ],
    order: 5,
    error_order: 4,
};

static CASH_KARP_45: ButcherTableau = ButcherTableau {
    c: &[0.0, 0.2, 0.3, 0.6, 1.0, 7.0 / 8.0],
    a: &[
        &[],
        &[0.2],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[0.3, -0.9, 1.2],
        &[-11.0 / 54.0, 2.5, -70.0 / 27.0, 35.0 / 27.0],
        &[
            1631.0 / 55296.0,
            175.0 / 512.0,
            575.0 / 13824.0,
            44275.0 / 110592.0,
            253.0 / 4096.0,
        ],
    ],
    b: &[
        37.0 / 378.0,
        0.0,
        250.0 / 621.0,
        125.0 / 594.0,
        0.0,
        512.0 / 1771.0,
    ],
    b_low: &[
        2825.0 / 27648.0,
        0.0,
        18575.0 / 48384.0,
        13525.0 / 55296.0,
        277.0 / 14336.0,
        0.25,
    ],
    order: 5,
    error_order: 4,
};

static DORMAND_PRINCE_45: ButcherTableau = ButcherTableau {
    c: &[0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0],
    a: &[
        &[],
        &[0.2],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
        ],
        &[
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
        ],
        &[
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ],
    b: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    b_low: &[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ],
    order: 5,
    error_order: 4,
};

/// Selectable integration scheme.
///
/// The numeric index (declaration order) is what optimizer configurations
/// pass around; see [`IntegrationScheme::try_from`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IntegrationScheme {
    /// Heun–Euler 2(1).
    ///
    /// The step count grows with the inverse square root of the tolerance,
    /// so at the default 1e-12 a day-long orbit exhausts the default
    /// `max_steps` and the run ends in
    /// [`IntegrationError::StepLimitExceeded`]. Pair it with tolerances
    /// around 1e-8 or looser.
    HeunEuler,
    /// Bogacki–Shampine 3(2)
    BogackiShampine,
    /// Runge–Kutta–Fehlberg 4(5)
    Fehlberg45,
    /// Cash–Karp 4(5)
    CashKarp45,
    /// Dormand–Prince 5(4)
    #[default]
    DormandPrince45,
}

impl IntegrationScheme {
    pub const ALL: [Self; 5] = [
        Self::HeunEuler,
        Self::BogackiShampine,
        Self::Fehlberg45,
        Self::CashKarp45,
        Self::DormandPrince45,
    ];

    pub fn tableau(self) -> &'static ButcherTableau {
        match self {
            Self::HeunEuler => &HEUN_EULER,
            Self::BogackiShampine => &BOGACKI_SHAMPINE,
            Self::Fehlberg45 => &FEHLBERG_45,
            Self::CashKarp45 => &CASH_KARP_45,
            Self::DormandPrince45 => &DORMAND_PRINCE_45,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::HeunEuler => "HeunEuler",
            Self::BogackiShampine => "BS32",
            Self::Fehlberg45 => "RKF45",
            Self::CashKarp45 => "RK45CK",
            Self::DormandPrince45 => "DOPRI45",
        }
    }

    /// Order of the propagated solution.
    pub fn order(self) -> u32 {
        self.tableau().order
    }
}

impl TryFrom<u32> for IntegrationScheme {
    type Error = ConfigError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(ConfigError::UnknownScheme(index))
    }
}

impl std::fmt::Display for IntegrationScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Output
// =============================================================================

/// One accepted integration step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub state: State,
    /// Derivative at `(time, state)`, kept for dense output
    pub derivative: StateDerivative,
}

/// Work counters of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegrationStats {
    pub accepted: usize,
    pub rejected: usize,
    /// Right-hand side evaluations
    pub evaluations: usize,
}

/// Result of a completed run.
#[derive(Clone, Debug)]
pub struct IntegrationOutput {
    /// Accepted steps, starting with the initial state
    pub samples: Vec<Sample>,
    /// Samples at which the event function was non-zero, and points of
    /// passes located between two clear samples, in time order
    pub events: Vec<EventRecord>,
    pub stats: IntegrationStats,
    /// A terminal event ended the run before the final time
    pub stopped_by_event: bool,
}

/// Numerical failure during a run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("step limit of {steps} attempts exceeded at t = {time}")]
    StepLimitExceeded { steps: usize, time: f64 },

    #[error("step size {step:e} fell below the minimum at t = {time}")]
    StepSizeUnderflow { time: f64, step: f64 },

    #[error("non-finite state or derivative at t = {time}")]
    NonFiniteState { time: f64 },
}

// =============================================================================
// Dense output
// =============================================================================

#[inline]
fn pack(v: DVec3) -> f64x4 {
    f64x4::new([v.x, v.y, v.z, 0.0])
}

#[inline]
fn unpack(v: f64x4) -> DVec3 {
    let [x, y, z, _] = v.to_array();
    DVec3::new(x, y, z)
}

/// Cubic Hermite interpolation between two samples.
///
/// Position uses the velocities as tangents, velocity uses the
/// accelerations. Each vector occupies three lanes of an `f64x4`.
pub fn hermite(a: &Sample, b: &Sample, t: f64) -> State {
    let step = b.time - a.time;
    if !(step > 0.0) {
        return a.state;
    }
    let s = (t - a.time) / step;

    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = f64x4::splat(2.0 * s3 - 3.0 * s2 + 1.0);
    let h10 = f64x4::splat((s3 - 2.0 * s2 + s) * step);
    let h01 = f64x4::splat(-2.0 * s3 + 3.0 * s2);
    let h11 = f64x4::splat((s3 - s2) * step);

    let position = pack(a.state.position) * h00
        + pack(a.state.velocity) * h10
        + pack(b.state.position) * h01
        + pack(b.state.velocity) * h11;
    let velocity = pack(a.state.velocity) * h00
        + pack(a.derivative.acceleration) * h10
        + pack(b.state.velocity) * h01
        + pack(b.derivative.acceleration) * h11;

    State::new(unpack(position), unpack(velocity))
}


// =============================================================================
// Integrator
// =============================================================================

/// Adaptive-step integrator for one scheme and controller configuration.
#[derive(Clone, Debug)]
pub struct AdaptiveIntegrator {
    scheme: IntegrationScheme,
    config: IntegratorConfig,
}

impl AdaptiveIntegrator {
    pub fn new(scheme: IntegrationScheme, config: IntegratorConfig) -> Self {
        Self { scheme, config }
    }

    pub fn scheme(&self) -> IntegrationScheme {
        self.scheme
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Integrate `rhs` from `(t0, y0)` to `tf`.
    ///
    /// `events` is evaluated on the initial state and after every accepted
    /// step; each sample where it is non-zero is recorded. When it is zero at
    /// both ends of a step, the points it reports between them are recorded
    /// too. A terminal event function ends the run at the first recorded
    /// point; an entry located inside a step replaces that step's end
    /// sample. The last sample of a complete run lies exactly at `tf`.
    pub fn integrate<F, E>(
        &self,
        rhs: F,
        t0: f64,
        y0: State,
        tf: f64,
        events: &E,
    ) -> Result<IntegrationOutput, IntegrationError>
    where
        F: Fn(f64, &State) -> StateDerivative,
        E: EventFunction + ?Sized,
    {
        let tableau = self.scheme.tableau();
        let config = &self.config;
        let mut stats = IntegrationStats::default();

        if !y0.is_finite() {
            return Err(IntegrationError::NonFiniteState { time: t0 });
        }

        let mut t = t0;
        let mut y = y0;
        let mut dy = rhs(t, &y);
        stats.evaluations += 1;
        if !dy.is_finite() {
            return Err(IntegrationError::NonFiniteState { time: t });
        }

        let mut samples = vec![Sample {
            time: t,
            state: y,
            derivative: dy,
        }];
        let mut records = Vec::new();

        let mut was_inside = events.indicator(t, &y) != 0.0;
        if was_inside {
            records.push(EventRecord {
                time: t,
                state: y,
                entry: true,
            });
        }
        let mut stopped_by_event = was_inside && events.is_terminal();

        let error_exponent = 1.0 / (f64::from(tableau.error_order) + 1.0);
        let mut stages = Vec::with_capacity(tableau.stages());
        let mut h = config.initial_dt.min(config.max_dt).min(tf - t0);
        let mut attempts = 0;

        while t < tf && !stopped_by_event {
            if attempts >= config.max_steps {
                return Err(IntegrationError::StepLimitExceeded {
                    steps: attempts,
                    time: t,
                });
            }
            attempts += 1;

            let remaining = tf - t;
            let last = h >= remaining;
            if last {
                h = remaining;
            }
            let t_new = if last { tf } else { t + h };

            let trial = trial_step(&rhs, tableau, t, &y, &dy, h, &mut stages, config);
            stats.evaluations += tableau.stages() - 1;

            let accepted = match trial {
                Some((y_new, error)) if error <= 1.0 => {
                    let dy_new = rhs(t_new, &y_new);
                    stats.evaluations += 1;
                    dy_new.is_finite().then_some((y_new, dy_new, error))
                }
                Some((_, error)) => {
                    stats.rejected += 1;
                    let factor = (config.safety_factor * error.powf(-error_exponent))
                        .clamp(config.min_scale, 1.0);
                    h *= factor;
                    if h < config.min_dt {
                        return Err(IntegrationError::StepSizeUnderflow { time: t, step: h });
                    }
                    continue;
                }
                None => None,
            };

            let Some((y_new, dy_new, error)) = accepted else {
                stats.rejected += 1;
                h *= NON_FINITE_SHRINK;
                if h < config.min_dt {
                    return Err(IntegrationError::NonFiniteState { time: t });
                }
                continue;
            };

            t = t_new;
            y = y_new;
            dy = dy_new;
            stats.accepted += 1;
            samples.push(Sample {
                time: t,
                state: y,
                derivative: dy,
            });

            let inside = events.indicator(t, &y) != 0.0;
            if inside {
                records.push(EventRecord {
                    time: t,
                    state: y,
                    entry: !was_inside,
                });
                stopped_by_event = events.is_terminal();
            } else if !was_inside {
                let n = samples.len();
                let passed = events.inside_between(&samples[n - 2], &samples[n - 1]);

                if let Some(&(time, state)) = passed.first() {
                    if events.is_terminal() {
                        let derivative = rhs(time, &state);
                        stats.evaluations += 1;
                        if !derivative.is_finite() {
                            return Err(IntegrationError::NonFiniteState { time });
                        }
                        samples.pop();
                        samples.push(Sample {
                            time,
                            state,
                            derivative,
                        });
                        records.push(EventRecord {
                            time,
                            state,
                            entry: true,
                        });
                        t = time;
                        stopped_by_event = true;
                    } else {
                        records.extend(passed.into_iter().enumerate().map(|(i, (time, state))| {
                            EventRecord {
                                time,
                                state,
                                entry: i == 0,
                            }
                        }));
                    }
                }
            }
            was_inside = inside;

            let factor = (config.safety_factor * error.powf(-error_exponent))
                .clamp(config.min_scale, config.max_scale);
            h = (h * factor).min(config.max_dt);
        }

        debug!(
            "{} run over [{}, {}] finished at t = {}: {} accepted, {} rejected, {} evaluations, {} events",
            self.scheme,
            t0,
            tf,
            t,
            stats.accepted,
            stats.rejected,
            stats.evaluations,
            records.len()
        );

        Ok(IntegrationOutput {
            samples,
            events: records,
            stats,
            stopped_by_event,
        })
    }
}

/// Attempt one step of size `h`.
///
/// Returns the propagated state and the scaled error norm (accept when ≤ 1),
/// or `None` if any stage or the result is not finite.
fn trial_step<F>(
    rhs: &F,
    tableau: &ButcherTableau,
    t: f64,
    y: &State,
    dy: &StateDerivative,
    h: f64,
    stages: &mut Vec<StateDerivative>,
    config: &IntegratorConfig,
) -> Option<(State, f64)>
where
    F: Fn(f64, &State) -> StateDerivative,
{
    stages.clear();
    stages.push(*dy);

    for (row, &c) in tableau.a.iter().zip(tableau.c).skip(1) {
        let increment = row
            .iter()
            .zip(stages.iter())
            .filter(|(a, _)| **a != 0.0)
            .fold(StateDerivative::ZERO, |acc, (&a, k)| acc + *k * a);
        let k = rhs(t + c * h, &y.advanced(&increment, h));
        if !k.is_finite() {
            return None;
        }
        stages.push(k);
    }

    let mut high = StateDerivative::ZERO;
    let mut error = StateDerivative::ZERO;
    for ((k, &b), &b_low) in stages.iter().zip(tableau.b).zip(tableau.b_low) {
        high = high + *k * b;
        error = error + *k * (b - b_low);
    }

    let y_new = y.advanced(&high, h);
    if !y_new.is_finite() {
        return None;
    }

    let norm = error_norm(y, &y_new, &(error * h).to_array(), config);
    norm.is_finite().then_some((y_new, norm))
}

/// RMS of the local error scaled by `atol + rtol * max(|y|, |y_new|)`.
fn error_norm(y: &State, y_new: &State, error: &[f64; STATE_DIM], config: &IntegratorConfig) -> f64 {
    let old = y.to_array();
    let new = y_new.to_array();

    let sum: f64 = (0..STATE_DIM)
        .map(|i| {
            let scale = config.atol + config.rtol * old[i].abs().max(new[i].abs());
            let scaled = error[i] / scale;
            scaled * scaled
        })
        .sum();

    (sum / STATE_DIM as f64).sqrt()
}

// =============================================================================
// Tests
// =============================================================================
