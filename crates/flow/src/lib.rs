#![deny(unsafe_code)]
//! Particle-flow visualization with continuous respawn.
//!
//! A fixed population of particles drifts along the field, one Euler step
//! per frame. A particle that stalls in a weak field, reaches a sink, leaves
//! the bounds ball or outlives `max_age` is respawned at a fresh volume
//! sample, so the population never shrinks and the flow never drains.

use efield_core::charge::{validate_charges, Charge};
use efield_core::error::FieldError;
use efield_core::evaluator::{validate_k, FieldEvaluator};
use efield_core::marker::{Marker, DEFAULT_REFERENCE_MAGNITUDE};
use efield_core::palette::Palette;
use efield_core::params::{merge_objects, param_f64, param_string, param_usize};
use efield_core::prng::Xorshift64;
use efield_core::seeding::sample_volume;
use efield_core::trace::{euler_step, Boundary, StepOutcome, StreamlinePoint, TraceConfig};
use efield_core::Visualization;
use glam::DVec3;
use serde::Serialize;
use serde_json::{json, Value};

/// Default resident population.
const DEFAULT_PARTICLE_COUNT: usize = 3000;
/// Largest accepted population.
pub const MAX_PARTICLE_COUNT: usize = 20_000;
/// Default clearance kept around charges when spawning.
const DEFAULT_EXCLUSION_RADIUS: f64 = 2.5;
/// Default lifetime in frames.
const DEFAULT_MAX_AGE: usize = 500;
const DEFAULT_PALETTE: &str = "white";

/// Keys of [`TraceConfig`] that particles ignore: lifetime is `max_age` and
/// every particle is drawn every frame.
const UNUSED_TRACE_KEYS: [&str; 2] = ["max_steps", "sample_stride"];

/// Tunables for [`Flow`].
///
/// Particles move with the same Euler step as traced lines, so stepping,
/// absorption, bounds and direction live in the embedded [`TraceConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlowParams {
    pub particle_count: usize,
    /// Spawn points keep at least this distance from every charge.
    pub exclusion_radius: f64,
    /// Frames a particle lives before it is respawned.
    pub max_age: usize,
    pub palette: String,
    pub reference_magnitude: f64,
    pub trace: TraceConfig,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            exclusion_radius: DEFAULT_EXCLUSION_RADIUS,
            max_age: DEFAULT_MAX_AGE,
            palette: DEFAULT_PALETTE.to_string(),
            reference_magnitude: DEFAULT_REFERENCE_MAGNITUDE,
            trace: TraceConfig::default(),
        }
    }
}

impl FlowParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    ///
    /// Stepping keys (`step_size`, `bounds_radius`, ...) sit at the top level
    /// next to the flow's own keys.
    pub fn from_json(params: &Value) -> Result<Self, FieldError> {
        Ok(Self {
            particle_count: param_usize(params, "particle_count", DEFAULT_PARTICLE_COUNT),
            exclusion_radius: param_f64(params, "exclusion_radius", DEFAULT_EXCLUSION_RADIUS),
            max_age: param_usize(params, "max_age", DEFAULT_MAX_AGE),
            palette: param_string(params, "palette", DEFAULT_PALETTE),
            reference_magnitude: param_f64(
                params,
                "reference_magnitude",
                DEFAULT_REFERENCE_MAGNITUDE,
            ),
            trace: TraceConfig::from_json(params)?,
        })
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        if self.particle_count > MAX_PARTICLE_COUNT {
            return Err(FieldError::invalid_param(
                "particle_count",
                format!("must be at most {MAX_PARTICLE_COUNT}"),
            ));
        }
        if !(self.exclusion_radius.is_finite() && self.exclusion_radius >= 0.0) {
            return Err(FieldError::invalid_param(
                "exclusion_radius",
                "must be finite and non-negative",
            ));
        }
        if !(self.reference_magnitude.is_finite() && self.reference_magnitude > 0.0) {
            return Err(FieldError::invalid_param(
                "reference_magnitude",
                "must be finite and positive",
            ));
        }
        if self.max_age == 0 {
            return Err(FieldError::invalid_param("max_age", "must be at least 1"));
        }
        self.trace.validate()
    }

    pub fn to_json(&self) -> Value {
        merge_objects(
            json!({
                "particle_count": self.particle_count,
                "exclusion_radius": self.exclusion_radius,
                "max_age": self.max_age,
                "palette": self.palette,
                "reference_magnitude": self.reference_magnitude,
            }),
            without_unused_trace_keys(self.trace.to_json()),
        )
    }
}

fn without_unused_trace_keys(mut value: Value) -> Value {
    if let Some(map) = value.as_object_mut() {
        for key in UNUSED_TRACE_KEYS {
            map.remove(key);
        }
    }
    value
}

/// Why a particle was respawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnCause {
    Weak,
    Absorbed,
    OutOfBounds,
    Expired,
}

/// Cumulative respawn counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowStats {
    pub frames: usize,
    pub weak: usize,
    pub absorbed: usize,
    pub out_of_bounds: usize,
    pub expired: usize,
}

impl FlowStats {
    fn record(&mut self, cause: RespawnCause) {
        match cause {
            RespawnCause::Weak => self.weak += 1,
            RespawnCause::Absorbed => self.absorbed += 1,
            RespawnCause::OutOfBounds => self.out_of_bounds += 1,
            RespawnCause::Expired => self.expired += 1,
        }
    }

    /// Respawns of every cause.
    pub fn total_respawns(&self) -> usize {
        self.weak + self.absorbed + self.out_of_bounds + self.expired
    }
}

/// A resident particle. `direction` and `magnitude` describe the field at
/// the point it last moved from, or at its spawn point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: DVec3,
    pub direction: DVec3,
    pub magnitude: f64,
    pub age: usize,
}

/// Resident particles advected by the field every frame.
pub struct Flow {
    charges: Vec<Charge>,
    k: f64,
    params: FlowParams,
    palette: Palette,
    rng: Xorshift64,
    particles: Vec<Particle>,
    markers: Vec<Marker>,
    stats: FlowStats,
}

impl Flow {
    /// Spawns the population. Initial ages are staggered over `[0, max_age)`
    /// so expiry respawns are spread across frames.
    pub fn new(
        charges: Vec<Charge>,
        k: f64,
        seed: u64,
        params: FlowParams,
    ) -> Result<Self, FieldError> {
        validate_charges(&charges)?;
        validate_k(k)?;
        params.validate()?;
        let palette = Palette::from_name(&params.palette)?;

        let mut rng = Xorshift64::new(seed);
        let evaluator = FieldEvaluator::new(&charges, k);
        let particles: Vec<Particle> = (0..params.particle_count)
            .map(|_| {
                let mut p = spawn(&mut rng, evaluator, &params);
                p.age = (rng.next_f64() * params.max_age as f64) as usize;
                p
            })
            .collect();
        log::debug!("flow: spawned {} particles", particles.len());

        let mut flow = Self {
            charges,
            k,
            params,
            palette,
            rng,
            particles,
            markers: Vec::new(),
            stats: FlowStats::default(),
        };
        flow.rebuild_markers();
        Ok(flow)
    }

    /// Creates the visualization from a JSON params object.
    pub fn from_json(
        charges: Vec<Charge>,
        k: f64,
        seed: u64,
        json_params: &Value,
    ) -> Result<Self, FieldError> {
        Self::new(charges, k, seed, FlowParams::from_json(json_params)?)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn stats(&self) -> FlowStats {
        self.stats
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    fn rebuild_markers(&mut self) {
        let reference = self.params.reference_magnitude;
        let palette = &self.palette;
        self.markers.clear();
        self.markers.extend(self.particles.iter().map(|p| {
            let sample = StreamlinePoint {
                position: p.position,
                direction: p.direction,
                magnitude: p.magnitude,
            };
            Marker::from_point(&sample, reference, palette)
        }));
    }
}

/// A fresh age-zero particle at a volume sample.
fn spawn(rng: &mut Xorshift64, evaluator: FieldEvaluator<'_>, params: &FlowParams) -> Particle {
    let position = sample_volume(
        rng,
        evaluator.charges(),
        params.trace.bounds_radius,
        params.exclusion_radius,
    )
    .point();
    let (unit, magnitude) = evaluator.direction(position);
    Particle {
        position,
        direction: unit * params.trace.direction.sign(),
        magnitude,
        age: 0,
    }
}

/// Moves one particle a frame forward, returning why it must respawn, if it must.
fn advance(
    particle: &mut Particle,
    evaluator: FieldEvaluator<'_>,
    params: &FlowParams,
) -> Option<RespawnCause> {
    let (sample, next, boundary) = match euler_step(particle.position, evaluator, &params.trace) {
        StepOutcome::Weak => return Some(RespawnCause::Weak),
        StepOutcome::Moved {
            sample,
            next,
            boundary,
        } => (sample, next, boundary),
    };
    particle.position = next;
    particle.direction = sample.direction;
    particle.magnitude = sample.magnitude;
    particle.age += 1;

    match boundary {
        Some(Boundary::Absorbed) => Some(RespawnCause::Absorbed),
        Some(Boundary::OutOfBounds) => Some(RespawnCause::OutOfBounds),
        None if particle.age >= params.max_age => Some(RespawnCause::Expired),
        None => None,
    }
}

impl Visualization for Flow {
    fn step(&mut self) -> Result<(), FieldError> {
        let Self {
            charges,
            k,
            params,
            rng,
            particles,
            stats,
            ..
        } = self;
        let evaluator = FieldEvaluator::new(charges, *k);
        for particle in particles.iter_mut() {
            if let Some(cause) = advance(particle, evaluator, params) {
                stats.record(cause);
                *particle = spawn(rng, evaluator, params);
            }
        }
        stats.frames += 1;
        log::trace!(
            "flow frame {}: {} respawns so far",
            stats.frames,
            stats.total_respawns()
        );
        self.rebuild_markers();
        Ok(())
    }

    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn charges(&self) -> &[Charge] {
        &self.charges
    }

    fn params(&self) -> Value {
        self.params.to_json()
    }

    fn param_schema(&self) -> Value {
        let own = json!({
            "particle_count": {
                "type": "integer",
                "default": DEFAULT_PARTICLE_COUNT,
                "min": 0,
                "max": MAX_PARTICLE_COUNT,
                "description": "Resident particle population"
            },
            "exclusion_radius": {
                "type": "number",
                "default": DEFAULT_EXCLUSION_RADIUS,
                "min": 0.0,
                "max": 10.0,
                "description": "Clearance kept around charges when spawning"
            },
            "max_age": {
                "type": "integer",
                "default": DEFAULT_MAX_AGE,
                "min": 1,
                "max": 10000,
                "description": "Frames a particle lives before respawning"
            },
            "palette": {
                "type": "string",
                "default": DEFAULT_PALETTE,
                "options": Palette::list_names(),
                "description": "Color ramp applied by field intensity"
            },
            "reference_magnitude": {
                "type": "number",
                "default": DEFAULT_REFERENCE_MAGNITUDE,
                "min": 0.001,
                "max": 1000.0,
                "description": "Field magnitude mapped to half intensity"
            }
        });
        merge_objects(own, without_unused_trace_keys(TraceConfig::schema()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efield_core::charge::{dipole, nearest_charge_distance};
    use efield_core::evaluator::DEFAULT_COULOMB_K;
    use efield_core::trace::{
        Trace, TraceDirection, TraceState, DEFAULT_BOUNDS_RADIUS, DEFAULT_STEP_SIZE,
        MAX_STEPS_LIMIT,
    };

    fn flow(count: usize, seed: u64) -> Flow {
        let params = FlowParams {
            particle_count: count,
            ..FlowParams::default()
        };
        Flow::new(dipole(), DEFAULT_COULOMB_K, seed, params).unwrap()
    }

    fn positions(f: &Flow) -> Vec<DVec3> {
        f.particles().iter().map(|p| p.position).collect()
    }

    // ---- Construction ----

    #[test]
    fn spawns_requested_population_clear_of_charges() {
        let f = flow(400, 42);
        assert_eq!(f.particles().len(), 400);
        assert_eq!(f.markers().len(), 400);
        for p in f.particles() {
            assert!(nearest_charge_distance(p.position, &dipole()) >= DEFAULT_EXCLUSION_RADIUS);
            assert!(p.age < DEFAULT_MAX_AGE);
        }
    }

    #[test]
    fn initial_ages_are_staggered() {
        let f = flow(200, 1);
        let first = f.particles()[0].age;
        assert!(f.particles().iter().any(|p| p.age != first));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let zero_age = FlowParams {
            max_age: 0,
            ..FlowParams::default()
        };
        assert!(Flow::new(dipole(), DEFAULT_COULOMB_K, 0, zero_age).is_err());
        let bad_step = FlowParams {
            trace: TraceConfig {
                step_size: -0.1,
                ..TraceConfig::default()
            },
            ..FlowParams::default()
        };
        assert!(Flow::new(dipole(), DEFAULT_COULOMB_K, 0, bad_step).is_err());
        let crowded = FlowParams {
            particle_count: MAX_PARTICLE_COUNT + 1,
            ..FlowParams::default()
        };
        assert!(matches!(
            Flow::new(dipole(), DEFAULT_COULOMB_K, 0, crowded),
            Err(FieldError::InvalidParam { .. })
        ));
        assert!(Flow::new(vec![], DEFAULT_COULOMB_K, 0, FlowParams::default()).is_err());
    }

    // ---- Stepping ----

    #[test]
    fn population_is_constant_and_bounded() {
        let mut f = flow(300, 7);
        for _ in 0..120 {
            f.step().unwrap();
            assert_eq!(f.particles().len(), 300);
            assert_eq!(f.markers().len(), 300);
            for p in f.particles() {
                assert!(p.position.length() <= DEFAULT_BOUNDS_RADIUS + 1e-9);
                assert!(p.age < DEFAULT_MAX_AGE);
            }
        }
        assert_eq!(f.stats().frames, 120);
    }

    #[test]
    fn particles_move_along_the_field() {
        let mut f = flow(50, 3);
        let before = f.particles().to_vec();
        f.step().unwrap();
        for (old, new) in before.iter().zip(f.particles()) {
            if new.age == old.age + 1 {
                let moved = new.position - old.position;
                assert!((moved.length() - DEFAULT_STEP_SIZE).abs() < 1e-9);
                assert!((moved.normalize() - new.direction).length() < 1e-9);
            }
        }
    }

    #[test]
    fn particles_near_the_sink_are_absorbed() {
        let params = FlowParams {
            particle_count: 1,
            ..FlowParams::default()
        };
        let mut f = Flow::new(dipole(), DEFAULT_COULOMB_K, 5, params).unwrap();
        f.particles[0] = Particle {
            position: DVec3::new(5.4, 0.0, 0.0),
            direction: DVec3::X,
            magnitude: 1.0,
            age: 0,
        };
        f.step().unwrap();
        assert_eq!(f.stats().absorbed, 1);
        assert_eq!(f.particles()[0].age, 0);
    }

    #[test]
    fn backward_flow_is_absorbed_by_the_source() {
        let params = FlowParams {
            particle_count: 1,
            trace: TraceConfig {
                direction: TraceDirection::Backward,
                ..TraceConfig::default()
            },
            ..FlowParams::default()
        };
        let mut f = Flow::new(dipole(), DEFAULT_COULOMB_K, 5, params).unwrap();
        f.particles[0].position = DVec3::new(-5.4, 0.0, 0.0);
        f.particles[0].age = 0;
        f.step().unwrap();
        assert_eq!(f.stats().absorbed, 1);
    }

    #[test]
    fn particles_leaving_bounds_respawn() {
        let charges = vec![Charge::new(DVec3::ZERO, 1.0)];
        let params = FlowParams {
            particle_count: 1,
            ..FlowParams::default()
        };
        let mut f = Flow::new(charges, DEFAULT_COULOMB_K, 5, params).unwrap();
        f.particles[0].position = DVec3::new(29.9, 0.0, 0.0);
        f.particles[0].age = 0;
        f.step().unwrap();
        assert_eq!(f.stats().out_of_bounds, 1);
        assert!(f.particles()[0].position.length() <= DEFAULT_BOUNDS_RADIUS + 1e-9);
    }

    #[test]
    fn old_particles_expire() {
        let mut f = flow(1, 9);
        f.particles[0].position = DVec3::new(0.0, 10.0, 0.0);
        f.particles[0].age = DEFAULT_MAX_AGE - 1;
        f.step().unwrap();
        assert_eq!(f.stats().expired, 1);
        assert_eq!(f.particles()[0].age, 0);
    }

    #[test]
    fn particle_follows_the_traced_line_until_it_ends() {
        let mut f = flow(1, 13);
        let start = DVec3::new(-5.9, 0.5, 0.0);
        f.particles[0].position = start;
        f.particles[0].age = 0;

        let charges = dipole();
        let evaluator = FieldEvaluator::new(&charges, DEFAULT_COULOMB_K);
        let config = TraceConfig {
            max_steps: MAX_STEPS_LIMIT,
            ..f.params.trace
        };
        let mut trace = Trace::new(start, evaluator, &config);
        loop {
            trace.step();
            f.step().unwrap();
            if trace.state().is_terminal() {
                break;
            }
            assert_eq!(f.particles()[0].position, trace.position());
            assert_eq!(f.particles()[0].age, trace.steps());
        }
        assert_eq!(trace.state(), TraceState::TerminatedAbsorbed);
        assert_eq!(f.stats().absorbed, 1);
        assert_eq!(f.stats().total_respawns(), 1);
    }

    #[test]
    fn unused_trace_keys_are_not_exposed() {
        let f = flow(1, 1);
        for key in UNUSED_TRACE_KEYS {
            assert!(f.params().get(key).is_none());
            assert!(f.param_schema().get(key).is_none());
        }
        assert!(f.param_schema().get("step_size").is_some());
    }

    #[test]
    fn stalled_particles_respawn_as_weak() {
        let charges = vec![
            Charge::new(DVec3::new(-8.0, 0.0, 0.0), 1.0),
            Charge::new(DVec3::new(8.0, 0.0, 0.0), 1.0),
        ];
        let params = FlowParams {
            particle_count: 1,
            ..FlowParams::default()
        };
        let mut f = Flow::new(charges, DEFAULT_COULOMB_K, 2, params).unwrap();
        f.particles[0].position = DVec3::ZERO;
        f.step().unwrap();
        assert_eq!(f.stats().weak, 1);
        assert_eq!(f.stats().total_respawns(), 1);
    }

    #[test]
    fn same_seed_same_flow() {
        let mut a = flow(200, 11);
        let mut b = flow(200, 11);
        for _ in 0..50 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.markers(), b.markers());
    }

    #[test]
    fn different_seed_different_flow() {
        assert_ne!(positions(&flow(100, 1)), positions(&flow(100, 2)));
    }

    #[test]
    fn markers_follow_particles() {
        let mut f = flow(100, 4);
        f.step().unwrap();
        for (m, p) in f.markers().iter().zip(f.particles()) {
            assert_eq!(m.position, p.position);
            assert_eq!(m.direction, p.direction);
        }
    }

    // ---- Params ----

    #[test]
    fn from_json_uses_defaults_for_empty_json() {
        assert_eq!(
            FlowParams::from_json(&json!({})).unwrap(),
            FlowParams::default()
        );
    }

    #[test]
    fn params_round_trip_through_from_json() {
        let params = FlowParams {
            particle_count: 64,
            trace: TraceConfig {
                step_size: 0.35,
                direction: TraceDirection::Backward,
                ..TraceConfig::default()
            },
            palette: "viridis".to_string(),
            ..FlowParams::default()
        };
        let f = Flow::new(dipole(), DEFAULT_COULOMB_K, 0, params.clone()).unwrap();
        assert_eq!(FlowParams::from_json(&f.params()).unwrap(), params);
    }

    #[test]
    fn param_schema_covers_every_param() {
        let f = flow(1, 1);
        let schema = f.param_schema();
        for key in f.params().as_object().unwrap().keys() {
            assert!(schema.get(key).is_some(), "schema missing parameter: {key}");
            assert!(schema[key].get("type").is_some(), "{key} missing 'type'");
        }
    }

    #[test]
    fn stats_serialize_as_json_object() {
        let v = serde_json::to_value(FlowStats::default()).unwrap();
        assert_eq!(v["frames"], 0);
        assert_eq!(v["absorbed"], 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn count_and_bounds_hold_for_any_seed(
                seed: u64,
                count in 1_usize..80,
                frames in 1_usize..40,
            ) {
                let mut f = flow(count, seed);
                for _ in 0..frames {
                    f.step().unwrap();
                }
                prop_assert_eq!(f.particles().len(), count);
                for p in f.particles() {
                    prop_assert!(p.position.length() <= DEFAULT_BOUNDS_RADIUS + 1e-9);
                    prop_assert!(p.age < DEFAULT_MAX_AGE);
                    prop_assert!(p.position.is_finite());
                }
            }
        }
    }
}
