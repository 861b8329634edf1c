//! Field-line tracing by explicit Euler integration.
//!
//! A [`Trace`] walks from a seed along the unit field direction, emitting a
//! [`StreamlinePoint`] every `sample_stride` steps, until one of four
//! terminal conditions fires: the field is too weak to define a direction,
//! the cursor reaches a sink, the cursor leaves the bounds sphere, or the
//! iteration cap is hit. Terminal states are absorbing.

use crate::charge::Charge;
use crate::error::FieldError;
use crate::evaluator::FieldEvaluator;
use crate::params::{param_f64, param_string, param_usize};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Default distance advanced per step.
pub const DEFAULT_STEP_SIZE: f64 = 0.2;
/// Default iteration cap.
pub const DEFAULT_MAX_STEPS: usize = 500;
/// Default emission stride.
pub const DEFAULT_SAMPLE_STRIDE: usize = 3;
/// Default distance to a sink at which a trace is absorbed.
pub const DEFAULT_ABSORPTION_RADIUS: f64 = 2.5;
/// Default radius of the visualized volume, centered on the origin.
pub const DEFAULT_BOUNDS_RADIUS: f64 = 30.0;
/// Default field magnitude below which the direction is considered undefined.
pub const DEFAULT_MIN_FIELD_MAGNITUDE: f64 = 0.01;
/// Largest accepted iteration cap.
pub const MAX_STEPS_LIMIT: usize = 10_000;

/// Which way a trace follows the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceDirection {
    /// Along E, from sources toward negative charges.
    #[default]
    Forward,
    /// Against E, from sinks toward positive charges.
    Backward,
}

impl TraceDirection {
    /// Parses `"forward"` or `"backward"`.
    pub fn from_name(name: &str) -> Result<Self, FieldError> {
        match name {
            "forward" => Ok(TraceDirection::Forward),
            "backward" => Ok(TraceDirection::Backward),
            other => Err(FieldError::invalid_param(
                "direction",
                format!("expected \"forward\" or \"backward\", got \"{other}\""),
            )),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TraceDirection::Forward => "forward",
            TraceDirection::Backward => "backward",
        }
    }

    /// `1.0` for forward, `-1.0` for backward.
    pub fn sign(self) -> f64 {
        match self {
            TraceDirection::Forward => 1.0,
            TraceDirection::Backward => -1.0,
        }
    }

    /// Whether a trace moving this way terminates on `charge`.
    pub fn absorbs(self, charge: &Charge) -> bool {
        match self {
            TraceDirection::Forward => charge.is_sink(),
            TraceDirection::Backward => charge.is_source(),
        }
    }

    /// Whether lines moving this way start around `charge`.
    pub fn emits(self, charge: &Charge) -> bool {
        match self {
            TraceDirection::Forward => charge.is_source(),
            TraceDirection::Backward => charge.is_sink(),
        }
    }
}

/// Tunables for a single traced line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Distance advanced per Euler step.
    pub step_size: f64,
    /// Hard iteration cap; guarantees termination.
    pub max_steps: usize,
    /// Emit a point every Nth step. Zero behaves like one.
    pub sample_stride: usize,
    /// Distance to a sink at which the trace stops.
    pub absorption_radius: f64,
    /// Distance from the origin beyond which the trace stops.
    pub bounds_radius: f64,
    /// Field magnitude below which the trace stops.
    pub min_field_magnitude: f64,
    pub direction: TraceDirection,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            max_steps: DEFAULT_MAX_STEPS,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            absorption_radius: DEFAULT_ABSORPTION_RADIUS,
            bounds_radius: DEFAULT_BOUNDS_RADIUS,
            min_field_magnitude: DEFAULT_MIN_FIELD_MAGNITUDE,
            direction: TraceDirection::Forward,
        }
    }
}

impl TraceConfig {
    /// Extracts tracing parameters from a JSON object, falling back to defaults.
    ///
    /// An unrecognized `direction` string is reported as an error.
    pub fn from_json(params: &Value) -> Result<Self, FieldError> {
        let direction = TraceDirection::from_name(&param_string(params, "direction", "forward"))?;
        Ok(Self {
            step_size: param_f64(params, "step_size", DEFAULT_STEP_SIZE),
            max_steps: param_usize(params, "max_steps", DEFAULT_MAX_STEPS),
            sample_stride: param_usize(params, "sample_stride", DEFAULT_SAMPLE_STRIDE),
            absorption_radius: param_f64(params, "absorption_radius", DEFAULT_ABSORPTION_RADIUS),
            bounds_radius: param_f64(params, "bounds_radius", DEFAULT_BOUNDS_RADIUS),
            min_field_magnitude: param_f64(
                params,
                "min_field_magnitude",
                DEFAULT_MIN_FIELD_MAGNITUDE,
            ),
            direction,
        })
    }

    /// Rejects step sizes and radii that would make tracing meaningless.
    pub fn validate(&self) -> Result<(), FieldError> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(FieldError::invalid_param(
                "step_size",
                "must be finite and positive",
            ));
        }
        if !(self.bounds_radius.is_finite() && self.bounds_radius > 0.0) {
            return Err(FieldError::invalid_param(
                "bounds_radius",
                "must be finite and positive",
            ));
        }
        if !(self.absorption_radius.is_finite() && self.absorption_radius >= 0.0) {
            return Err(FieldError::invalid_param(
                "absorption_radius",
                "must be finite and non-negative",
            ));
        }
        if !(self.min_field_magnitude.is_finite() && self.min_field_magnitude >= 0.0) {
            return Err(FieldError::invalid_param(
                "min_field_magnitude",
                "must be finite and non-negative",
            ));
        }
        if self.max_steps > MAX_STEPS_LIMIT {
            return Err(FieldError::invalid_param(
                "max_steps",
                format!("must be at most {MAX_STEPS_LIMIT}"),
            ));
        }
        Ok(())
    }

    /// Current values as a JSON object, keyed like [`TraceConfig::from_json`].
    pub fn to_json(&self) -> Value {
        json!({
            "step_size": self.step_size,
            "max_steps": self.max_steps,
            "sample_stride": self.sample_stride,
            "absorption_radius": self.absorption_radius,
            "bounds_radius": self.bounds_radius,
            "min_field_magnitude": self.min_field_magnitude,
            "direction": self.direction.name(),
        })
    }

    /// Parameter schema for the tracing keys.
    pub fn schema() -> Value {
        json!({
            "step_size": {
                "type": "number",
                "default": DEFAULT_STEP_SIZE,
                "min": 0.01,
                "max": 2.0,
                "description": "Distance advanced per Euler step"
            },
            "max_steps": {
                "type": "integer",
                "default": DEFAULT_MAX_STEPS,
                "min": 1,
                "max": MAX_STEPS_LIMIT,
                "description": "Iteration cap per traced line"
            },
            "sample_stride": {
                "type": "integer",
                "default": DEFAULT_SAMPLE_STRIDE,
                "min": 1,
                "max": 50,
                "description": "Emit a marker every Nth step"
            },
            "absorption_radius": {
                "type": "number",
                "default": DEFAULT_ABSORPTION_RADIUS,
                "min": 0.0,
                "max": 10.0,
                "description": "Distance to a sink at which a line ends"
            },
            "bounds_radius": {
                "type": "number",
                "default": DEFAULT_BOUNDS_RADIUS,
                "min": 1.0,
                "max": 500.0,
                "description": "Radius of the visualized volume"
            },
            "min_field_magnitude": {
                "type": "number",
                "default": DEFAULT_MIN_FIELD_MAGNITUDE,
                "min": 0.0,
                "max": 10.0,
                "description": "Field magnitude below which a line ends"
            },
            "direction": {
                "type": "string",
                "default": "forward",
                "options": ["forward", "backward"],
                "description": "Follow the field (forward) or run against it (backward)"
            }
        })
    }

    fn stride(&self) -> usize {
        self.sample_stride.max(1)
    }
}

/// Lifecycle of a [`Trace`]. Every state other than `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceState {
    Running,
    /// Field magnitude fell below `min_field_magnitude`.
    TerminatedWeak,
    /// Came within `absorption_radius` of a sink.
    TerminatedAbsorbed,
    /// Left the `bounds_radius` sphere.
    TerminatedOutOfBounds,
    /// Hit `max_steps`.
    TerminatedMaxSteps,
}

impl TraceState {
    pub fn is_terminal(self) -> bool {
        self != TraceState::Running
    }
}

/// Geometric stop condition reached by an Euler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Within `absorption_radius` of a charge that absorbs the direction of travel.
    Absorbed,
    /// Beyond `bounds_radius` from the origin.
    OutOfBounds,
}

impl From<Boundary> for TraceState {
    fn from(boundary: Boundary) -> Self {
        match boundary {
            Boundary::Absorbed => TraceState::TerminatedAbsorbed,
            Boundary::OutOfBounds => TraceState::TerminatedOutOfBounds,
        }
    }
}

/// What one Euler step from a position produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The field is too weak to define a direction. Nothing moved.
    Weak,
    Moved {
        /// The field sampled at the starting position.
        sample: StreamlinePoint,
        /// Position after the step.
        next: DVec3,
        /// Set when `next` ends a line.
        boundary: Option<Boundary>,
    },
}

/// The single integration rule shared by traced lines and drifting particles.
///
/// Samples the field at `position`, moves `step_size` along the unit field
/// direction (against it for `backward`), then checks absorption before
/// bounds. Iteration caps and lifetimes are left to the caller.
pub fn euler_step(
    position: DVec3,
    evaluator: FieldEvaluator<'_>,
    config: &TraceConfig,
) -> StepOutcome {
    let (unit, magnitude) = evaluator.direction(position);
    if magnitude < config.min_field_magnitude || magnitude == 0.0 {
        return StepOutcome::Weak;
    }
    let direction = unit * config.direction.sign();
    let next = position + direction * config.step_size;

    let absorbed = evaluator
        .charges()
        .iter()
        .filter(|c| config.direction.absorbs(c))
        .any(|c| c.distance_to(next) < config.absorption_radius);
    let boundary = if absorbed {
        Some(Boundary::Absorbed)
    } else if next.length() > config.bounds_radius {
        Some(Boundary::OutOfBounds)
    } else {
        None
    };

    StepOutcome::Moved {
        sample: StreamlinePoint {
            position,
            direction,
            magnitude,
        },
        next,
        boundary,
    }
}

/// A sample emitted while tracing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamlinePoint {
    pub position: DVec3,
    /// Unit vector in the direction of travel.
    pub direction: DVec3,
    /// Field magnitude at `position`.
    pub magnitude: f64,
}

/// The output of one finished trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Streamline {
    pub points: Vec<StreamlinePoint>,
    pub state: TraceState,
    /// Euler steps taken before termination.
    pub steps: usize,
}

/// Cursor state for a line being traced.
pub struct Trace<'a> {
    evaluator: FieldEvaluator<'a>,
    config: &'a TraceConfig,
    position: DVec3,
    step: usize,
    state: TraceState,
}

impl<'a> Trace<'a> {
    /// Starts a trace at `seed`. A zero `max_steps` yields an already terminated trace.
    pub fn new(seed: DVec3, evaluator: FieldEvaluator<'a>, config: &'a TraceConfig) -> Self {
        let state = if config.max_steps == 0 {
            TraceState::TerminatedMaxSteps
        } else {
            TraceState::Running
        };
        Self {
            evaluator,
            config,
            position: seed,
            step: 0,
            state,
        }
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Number of Euler steps taken so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Performs one integration step, returning the point emitted by it, if any.
    ///
    /// Does nothing once the trace is terminated.
    pub fn step(&mut self) -> Option<StreamlinePoint> {
        if self.state.is_terminal() {
            return None;
        }

        let (sample, next, boundary) =
            match euler_step(self.position, self.evaluator, self.config) {
                StepOutcome::Weak => {
                    self.state = TraceState::TerminatedWeak;
                    return None;
                }
                StepOutcome::Moved {
                    sample,
                    next,
                    boundary,
                } => (sample, next, boundary),
            };

        let emitted = (self.step % self.config.stride() == 0).then_some(sample);
        self.position = next;
        self.step += 1;

        if let Some(boundary) = boundary {
            self.state = boundary.into();
        } else if self.step >= self.config.max_steps {
            self.state = TraceState::TerminatedMaxSteps;
        }

        emitted
    }

    /// Steps until terminated and collects the emitted points.
    pub fn run(mut self) -> Streamline {
        let mut points = Vec::new();
        while !self.state.is_terminal() {
            if let Some(p) = self.step() {
                points.push(p);
            }
        }
        log::trace!(
            "trace ended {:?} after {} steps with {} points",
            self.state,
            self.step,
            points.len()
        );
        Streamline {
            points,
            state: self.state,
            steps: self.step,
        }
    }
}

/// Traces one line from `seed` to termination.
pub fn trace_line(seed: DVec3, evaluator: FieldEvaluator<'_>, config: &TraceConfig) -> Streamline {
    Trace::new(seed, evaluator, config).run()
}

/// Traces every seed in order.
pub fn trace_all(
    seeds: &[DVec3],
    evaluator: FieldEvaluator<'_>,
    config: &TraceConfig,
) -> Vec<Streamline> {
    let lines: Vec<Streamline> = seeds
        .iter()
        .map(|&seed| trace_line(seed, evaluator, config))
        .collect();
    log::debug!(
        "traced {} lines, {} points total",
        lines.len(),
        lines.iter().map(|l| l.points.len()).sum::<usize>()
    );
    lines
}
