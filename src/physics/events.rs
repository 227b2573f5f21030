//! Event functions evaluated by the integrator on accepted steps.
//!
//! An event function is an immutable value handed to the integrator for one
//! run. Whether it stops the run is part of that value, not shared state.
//! Besides the check at every accepted sample, an event function may look
//! for passes through its region between two clear samples on the dense
//! output.

use bevy::math::DVec3;

use crate::physics::integrator::{Sample, hermite};
use crate::types::State;

/// Grid points used to seed the search for the deepest point of a pass.
const PASS_SCAN_POINTS: usize = 16;

/// Iterations of the golden-section and bisection searches.
const SEARCH_ITERATIONS: usize = 60;

/// Condition checked after every accepted integration step.
pub trait EventFunction {
    /// Non-zero while the event condition holds.
    fn indicator(&self, t: f64, state: &State) -> f64;

    /// Stop integrating at the first recorded event.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Times and states where the condition holds strictly between two
    /// accepted samples at which it does not, in time order. The first one
    /// is where the path enters the region.
    fn inside_between(&self, _from: &Sample, _to: &Sample) -> Vec<(f64, State)> {
        Vec::new()
    }
}

/// Event function that never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEvents;

impl EventFunction for NoEvents {
    fn indicator(&self, _t: f64, _state: &State) -> f64 {
        0.0
    }
}

/// Point recorded while an event condition held.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventRecord {
    /// Time of the accepted step, or of a point located between two steps
    pub time: f64,
    /// State at that time (inertial frame)
    pub state: State,
    /// First point after the condition was clear
    pub entry: bool,
}

impl EventRecord {
    pub fn position(&self) -> DVec3 {
        self.state.position
    }
}

/// Sample recorded inside the risk zone.
pub type RiskZoneEvent = EventRecord;

/// Spherical safety margin around the body.
///
/// The radius must exceed the body's largest protuberance, so every surface
/// collision is preceded by a risk zone event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskZoneDetector {
    /// Radius of the bounding sphere
    pub radius: f64,
    /// Stop at the first event
    pub terminal: bool,
}

impl RiskZoneDetector {
    /// Non-terminal detector: integration always continues to the final time.
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            terminal: false,
        }
    }

    pub fn terminal(radius: f64) -> Self {
        Self {
            radius,
            terminal: true,
        }
    }

    /// Signed distance to the zone boundary, `|position| - radius`.
    /// Negative strictly inside the zone.
    #[inline]
    pub fn distance(&self, state: &State) -> f64 {
        state.position.length() - self.radius
    }

    /// Strictly inside; a point exactly on the boundary is outside.
    #[inline]
    pub fn is_inside(&self, state: &State) -> bool {
        self.distance(state) < 0.0
    }

    /// Whether the chord between two positions passes strictly inside the zone.
    pub fn segment_enters(&self, from: DVec3, to: DVec3) -> bool {
        let chord = to - from;
        let length_squared = chord.length_squared();
        let closest = if length_squared > 0.0 {
            let s = (-from.dot(chord) / length_squared).clamp(0.0, 1.0);
            from + chord * s
        } else {
            from
        };
        closest.length() < self.radius
    }

    /// Entry point and deepest point of a pass through the zone between two
    /// samples that are both outside it, located on the Hermite interpolant.
    ///
    /// Empty when either sample is inside, or when the path between them
    /// stays outside.
    pub fn pass_between(&self, from: &Sample, to: &Sample) -> Vec<(f64, State)> {
        if self.is_inside(&from.state)
            || self.is_inside(&to.state)
            || !self.segment_enters(from.state.position, to.state.position)
        {
            return Vec::new();
        }

        let at = |t: f64| hermite(from, to, t);
        let distance = |t: f64| self.distance(&at(t));
        let grid = |k: usize| {
            if k == PASS_SCAN_POINTS {
                to.time
            } else {
                from.time + (to.time - from.time) * k as f64 / PASS_SCAN_POINTS as f64
            }
        };

        let Some(nearest) =
            (0..=PASS_SCAN_POINTS).min_by(|&i, &j| distance(grid(i)).total_cmp(&distance(grid(j))))
        else {
            return Vec::new();
        };
        let deepest = golden_section_min(
            grid(nearest.saturating_sub(1)),
            grid((nearest + 1).min(PASS_SCAN_POINTS)),
            distance,
        );
        let deepest_state = at(deepest);
        if !self.is_inside(&deepest_state) {
            return Vec::new();
        }

        // `clear` stays outside, `inside` stays strictly inside
        let (mut clear, mut inside) = (from.time, deepest);
        for _ in 0..SEARCH_ITERATIONS {
            let mid = 0.5 * (clear + inside);
            if mid <= clear || mid >= inside {
                break;
            }
            if distance(mid) < 0.0 {
                inside = mid;
            } else {
                clear = mid;
            }
        }

        let mut points = vec![(inside, at(inside))];
        if deepest > inside {
            points.push((deepest, deepest_state));
        }
        points
    }
}

/// Minimum of `f` on `[lo, hi]` by golden-section search; `f` is assumed
/// unimodal on the bracket.
fn golden_section_min(mut lo: f64, mut hi: f64, f: impl Fn(f64) -> f64) -> f64 {
    let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut a = hi - ratio * (hi - lo);
    let mut b = lo + ratio * (hi - lo);
    let (mut fa, mut fb) = (f(a), f(b));

    for _ in 0..SEARCH_ITERATIONS {
        if fa < fb {
            hi = b;
            b = a;
            fb = fa;
            a = hi - ratio * (hi - lo);
            fa = f(a);
        } else {
            lo = a;
            a = b;
            fa = fb;
            b = lo + ratio * (hi - lo);
            fb = f(b);
        }
    }

    0.5 * (lo + hi)
}

impl EventFunction for RiskZoneDetector {
    /// `1.0` strictly inside the zone, `0.0` otherwise.
    fn indicator(&self, _t: f64, state: &State) -> f64 {
        if self.is_inside(state) { 1.0 } else { 0.0 }
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn inside_between(&self, from: &Sample, to: &Sample) -> Vec<(f64, State)> {
        self.pass_between(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateDerivative;

    fn at(position: DVec3) -> State {
        State::new(position, DVec3::ZERO)
    }

    /// Sample of unaccelerated motion.
    fn coasting(time: f64, position: DVec3, velocity: DVec3) -> Sample {
        Sample {
            time,
            state: State::new(position, velocity),
            derivative: StateDerivative::new(velocity, DVec3::ZERO),
        }
    }

    #[test]
    fn test_boundary_is_not_an_event() {
        let detector = RiskZoneDetector::new(5.0);
        let state = at(DVec3::new(3.0, 4.0, 0.0));
        assert_eq!(detector.distance(&state), 0.0);
        assert_eq!(detector.indicator(0.0, &state), 0.0);
        assert!(!detector.is_inside(&state));
    }

    #[test]
    fn test_inside_is_an_event() {
        let detector = RiskZoneDetector::new(5.0);
        let state = at(DVec3::new(3.0, 3.999_999, 0.0));
        assert!(detector.is_inside(&state));
        assert_eq!(detector.indicator(0.0, &state), 1.0);
        assert_eq!(detector.indicator(0.0, &at(DVec3::new(0.0, 0.0, 4.9))), 1.0);
        assert_eq!(detector.indicator(0.0, &at(DVec3::ZERO)), 1.0);
    }

    #[test]
    fn test_outside_is_not_an_event() {
        let detector = RiskZoneDetector::new(5.0);
        assert_eq!(detector.indicator(0.0, &at(DVec3::new(0.0, 5.1, 0.0))), 0.0);
        assert!(detector.distance(&at(DVec3::new(0.0, 5.1, 0.0))) > 0.0);
    }

    #[test]
    fn test_terminal_flag_is_part_of_the_value() {
        assert!(!RiskZoneDetector::new(1.0).is_terminal());
        assert!(RiskZoneDetector::terminal(1.0).is_terminal());
        assert!(!NoEvents.is_terminal());
    }

    #[test]
    fn test_segment_entering_zone() {
        let detector = RiskZoneDetector::new(3.0);
        // Both endpoints outside, chord passes 0.5 from the origin
        assert!(detector.segment_enters(DVec3::new(-10.0, 0.5, 0.0), DVec3::new(10.0, 0.5, 0.0)));
        // Chord stays outside
        assert!(!detector.segment_enters(DVec3::new(-10.0, 4.0, 0.0), DVec3::new(10.0, 4.0, 0.0)));
        // Closest approach beyond the segment end
        assert!(!detector.segment_enters(DVec3::new(-10.0, 0.0, 0.0), DVec3::new(-5.0, 0.0, 0.0)));
        // Degenerate segment
        assert!(detector.segment_enters(DVec3::ONE, DVec3::ONE));
    }

    #[test]
    fn test_pass_between_clear_samples() {
        let detector = RiskZoneDetector::new(3.0);
        let velocity = DVec3::new(10.0, 0.0, 0.0);
        let from = coasting(1.0, DVec3::new(-4.5, 0.2, 0.2), velocity);
        let to = coasting(2.0, DVec3::new(5.5, 0.2, 0.2), velocity);

        let points = detector.pass_between(&from, &to);
        assert_eq!(points.len(), 2);

        // |(x, 0.2, 0.2)| = 3 at x = -sqrt(8.92)
        let (entry_time, entry) = points[0];
        assert!((entry_time - (1.0 + (4.5 - 8.92_f64.sqrt()) / 10.0)).abs() < 1e-9);
        assert!(detector.is_inside(&entry));
        assert!(detector.distance(&entry) > -1e-9);

        let (deepest_time, deepest) = points[1];
        assert!((deepest_time - 1.45).abs() < 1e-6);
        assert!((deepest.position - DVec3::new(0.0, 0.2, 0.2)).length() < 1e-5);
        assert!(entry_time < deepest_time);
    }

    #[test]
    fn test_pass_between_requires_path_inside() {
        let detector = RiskZoneDetector::new(3.0);
        let velocity = DVec3::new(10.0, 0.0, 0.0);

        // Chord passes 4 from the center
        let from = coasting(0.0, DVec3::new(-5.0, 4.0, 0.0), velocity);
        let to = coasting(1.0, DVec3::new(5.0, 4.0, 0.0), velocity);
        assert!(detector.pass_between(&from, &to).is_empty());

        // An endpoint inside is an ordinary event, not a pass
        let from = coasting(0.0, DVec3::new(-5.0, 0.5, 0.0), velocity);
        let to = coasting(1.0, DVec3::new(0.0, 0.5, 0.0), velocity);
        assert!(detector.pass_between(&from, &to).is_empty());
    }

    #[test]
    fn test_only_the_risk_zone_reports_passes() {
        let velocity = DVec3::new(10.0, 0.0, 0.0);
        let from = coasting(0.0, DVec3::new(-5.0, 0.0, 0.0), velocity);
        let to = coasting(1.0, DVec3::new(5.0, 0.0, 0.0), velocity);
        assert!(NoEvents.inside_between(&from, &to).is_empty());
        assert_eq!(
            RiskZoneDetector::new(3.0).inside_between(&from, &to).len(),
            2
        );
    }
}
