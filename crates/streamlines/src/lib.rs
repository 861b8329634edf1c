#![deny(unsafe_code)]
//! Traced field-line visualization.
//!
//! Seeds a Fibonacci sphere of lines just outside every emitting charge
//! (positive charges when tracing forward, negative when backward), traces
//! each line to termination and turns every emitted point into a marker.
//! The result is static: markers are computed once at construction.

use efield_core::charge::{validate_charges, Charge};
use efield_core::error::FieldError;
use efield_core::evaluator::{validate_k, FieldEvaluator};
use efield_core::marker::{Marker, DEFAULT_REFERENCE_MAGNITUDE};
use efield_core::palette::Palette;
use efield_core::params::{merge_objects, param_f64, param_string, param_usize};
use efield_core::seeding::fibonacci_sphere;
use efield_core::trace::{trace_all, Streamline, TraceConfig, TraceDirection};
use efield_core::Visualization;
use glam::DVec3;
use serde_json::{json, Value};

/// Default number of lines seeded around each emitting charge.
const DEFAULT_LINE_COUNT: usize = 80;
/// Largest accepted `line_count`.
pub const MAX_LINE_COUNT: usize = 1000;
/// Default seed-sphere radius, just outside the drawn charge surface.
const DEFAULT_SEED_OFFSET: f64 = 2.1;
/// Default marker palette: uncolored cones.
const DEFAULT_PALETTE: &str = "white";

/// Tunables for [`Streamlines`].
#[derive(Debug, Clone, PartialEq)]
pub struct StreamlinesParams {
    /// Lines seeded around each emitting charge.
    pub line_count: usize,
    /// Distance of the seeds from their charge's center.
    pub seed_offset: f64,
    /// Name of a built-in palette.
    pub palette: String,
    /// Field magnitude mapped to half intensity.
    pub reference_magnitude: f64,
    pub trace: TraceConfig,
}

impl Default for StreamlinesParams {
    fn default() -> Self {
        Self {
            line_count: DEFAULT_LINE_COUNT,
            seed_offset: DEFAULT_SEED_OFFSET,
            palette: DEFAULT_PALETTE.to_string(),
            reference_magnitude: DEFAULT_REFERENCE_MAGNITUDE,
            trace: TraceConfig::default(),
        }
    }
}

impl StreamlinesParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    ///
    /// Tracing keys (`step_size`, `sample_stride`, ...) sit at the top level
    /// next to the streamline keys.
    pub fn from_json(params: &Value) -> Result<Self, FieldError> {
        Ok(Self {
            line_count: param_usize(params, "line_count", DEFAULT_LINE_COUNT),
            seed_offset: param_f64(params, "seed_offset", DEFAULT_SEED_OFFSET),
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
        if self.line_count > MAX_LINE_COUNT {
            return Err(FieldError::invalid_param(
                "line_count",
                format!("must be at most {MAX_LINE_COUNT}"),
            ));
        }
        if !(self.seed_offset.is_finite() && self.seed_offset > 0.0) {
            return Err(FieldError::invalid_param(
                "seed_offset",
                "must be finite and positive",
            ));
        }
        if !(self.reference_magnitude.is_finite() && self.reference_magnitude > 0.0) {
            return Err(FieldError::invalid_param(
                "reference_magnitude",
                "must be finite and positive",
            ));
        }
        self.trace.validate()
    }

    pub fn to_json(&self) -> Value {
        merge_objects(
            json!({
                "line_count": self.line_count,
                "seed_offset": self.seed_offset,
                "palette": self.palette,
                "reference_magnitude": self.reference_magnitude,
            }),
            self.trace.to_json(),
        )
    }
}

/// Seeds for every charge that emits lines in `direction`, charge by charge.
pub fn seed_points(
    charges: &[Charge],
    direction: TraceDirection,
    line_count: usize,
    offset: f64,
) -> Vec<DVec3> {
    charges
        .iter()
        .filter(|c| direction.emits(c))
        .flat_map(|c| fibonacci_sphere(c.position, offset, line_count))
        .collect()
}

/// Field lines traced from Fibonacci seeds around each emitting charge.
pub struct Streamlines {
    charges: Vec<Charge>,
    k: f64,
    params: StreamlinesParams,
    lines: Vec<Streamline>,
    markers: Vec<Marker>,
}

impl Streamlines {
    /// Traces every line and builds the markers.
    ///
    /// Returns an error for an empty or non-finite charge set, a non-finite
    /// `k`, out-of-range parameters or an unknown palette name.
    pub fn new(charges: Vec<Charge>, k: f64, params: StreamlinesParams) -> Result<Self, FieldError> {
        validate_charges(&charges)?;
        validate_k(k)?;
        params.validate()?;
        let palette = Palette::from_name(&params.palette)?;

        let seeds = seed_points(
            &charges,
            params.trace.direction,
            params.line_count,
            params.seed_offset,
        );
        let lines = trace_all(&seeds, FieldEvaluator::new(&charges, k), &params.trace);
        let markers: Vec<Marker> = lines
            .iter()
            .flat_map(|line| &line.points)
            .map(|p| Marker::from_point(p, params.reference_magnitude, &palette))
            .collect();
        log::debug!(
            "streamlines: {} seeds, {} markers",
            seeds.len(),
            markers.len()
        );

        Ok(Self {
            charges,
            k,
            params,
            lines,
            markers,
        })
    }

    /// Creates the visualization from a JSON params object.
    pub fn from_json(charges: Vec<Charge>, k: f64, json_params: &Value) -> Result<Self, FieldError> {
        Self::new(charges, k, StreamlinesParams::from_json(json_params)?)
    }

    /// The traced lines, in seed order.
    pub fn lines(&self) -> &[Streamline] {
        &self.lines
    }

    pub fn k(&self) -> f64 {
        self.k
    }
}

impl Visualization for Streamlines {
    /// Static: lines are traced once at construction.
    fn step(&mut self) -> Result<(), FieldError> {
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
        merge_objects(
            json!({
                "line_count": {
                    "type": "integer",
                    "default": DEFAULT_LINE_COUNT,
                    "min": 0,
                    "max": MAX_LINE_COUNT,
                    "description": "Lines seeded around each emitting charge"
                },
                "seed_offset": {
                    "type": "number",
                    "default": DEFAULT_SEED_OFFSET,
                    "min": 0.1,
                    "max": 10.0,
                    "description": "Distance of line seeds from the charge center"
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
            }),
            TraceConfig::schema(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efield_core::charge::{dipole, CHARGE_SURFACE_RADIUS};
    use efield_core::evaluator::DEFAULT_COULOMB_K;
    use efield_core::trace::TraceState;

    fn dipole_lines(params: StreamlinesParams) -> Streamlines {
        Streamlines::new(dipole(), DEFAULT_COULOMB_K, params).unwrap()
    }

    // ---- Construction ----

    #[test]
    fn default_dipole_traces_one_sphere_of_lines() {
        let s = dipole_lines(StreamlinesParams::default());
        assert_eq!(s.lines().len(), DEFAULT_LINE_COUNT);
        assert!(!s.markers().is_empty());
    }

    #[test]
    fn seeds_sit_on_the_offset_sphere_around_the_source() {
        let seeds = seed_points(&dipole(), TraceDirection::Forward, 20, 2.1);
        let source = DVec3::new(-8.0, 0.0, 0.0);
        assert_eq!(seeds.len(), 20);
        for s in seeds {
            assert!((s.distance(source) - 2.1).abs() < 1e-9);
        }
    }

    #[test]
    fn default_seeds_start_outside_the_charge_surface() {
        assert!(DEFAULT_SEED_OFFSET > CHARGE_SURFACE_RADIUS);
    }

    #[test]
    fn backward_tracing_seeds_around_the_sink() {
        let seeds = seed_points(&dipole(), TraceDirection::Backward, 12, 2.1);
        let sink = DVec3::new(8.0, 0.0, 0.0);
        assert!(seeds.iter().all(|s| (s.distance(sink) - 2.1).abs() < 1e-9));
    }

    #[test]
    fn every_source_gets_its_own_sphere() {
        let charges = vec![
            Charge::new(DVec3::new(-8.0, 0.0, 0.0), 1.0),
            Charge::new(DVec3::new(0.0, 8.0, 0.0), 2.0),
            Charge::new(DVec3::new(8.0, 0.0, 0.0), -1.0),
        ];
        let seeds = seed_points(&charges, TraceDirection::Forward, 10, 2.1);
        assert_eq!(seeds.len(), 20);
    }

    #[test]
    fn only_sinks_forward_gives_no_markers() {
        let charges = vec![Charge::new(DVec3::ZERO, -1.0)];
        let s = Streamlines::new(charges, DEFAULT_COULOMB_K, StreamlinesParams::default()).unwrap();
        assert!(s.lines().is_empty());
        assert!(s.markers().is_empty());
    }

    #[test]
    fn empty_charges_are_rejected() {
        assert!(Streamlines::new(vec![], 1.0, StreamlinesParams::default()).is_err());
    }

    #[test]
    fn unknown_palette_is_rejected() {
        let params = StreamlinesParams {
            palette: "sepia".to_string(),
            ..StreamlinesParams::default()
        };
        assert!(matches!(
            Streamlines::new(dipole(), DEFAULT_COULOMB_K, params),
            Err(FieldError::InvalidPalette(_))
        ));
    }

    #[test]
    fn non_positive_offset_is_rejected() {
        let params = StreamlinesParams {
            seed_offset: 0.0,
            ..StreamlinesParams::default()
        };
        assert!(Streamlines::new(dipole(), DEFAULT_COULOMB_K, params).is_err());
    }

    #[test]
    fn line_count_above_schema_max_is_rejected() {
        let params = StreamlinesParams {
            line_count: MAX_LINE_COUNT + 1,
            ..StreamlinesParams::default()
        };
        assert!(matches!(
            Streamlines::new(dipole(), DEFAULT_COULOMB_K, params),
            Err(FieldError::InvalidParam { .. })
        ));
        let at_max = StreamlinesParams {
            line_count: MAX_LINE_COUNT,
            ..StreamlinesParams::default()
        };
        assert!(at_max.validate().is_ok());
    }

    // ---- Output ----

    #[test]
    fn markers_are_every_emitted_point_in_line_order() {
        let s = dipole_lines(StreamlinesParams::default());
        let points: Vec<DVec3> = s
            .lines()
            .iter()
            .flat_map(|l| l.points.iter().map(|p| p.position))
            .collect();
        let markers: Vec<DVec3> = s.markers().iter().map(|m| m.position).collect();
        assert_eq!(points, markers);
    }

    #[test]
    fn each_line_starts_at_its_seed() {
        let params = StreamlinesParams {
            line_count: 16,
            ..StreamlinesParams::default()
        };
        let s = dipole_lines(params.clone());
        let seeds = seed_points(&dipole(), TraceDirection::Forward, 16, params.seed_offset);
        for (line, seed) in s.lines().iter().zip(seeds) {
            assert_eq!(line.points[0].position, seed);
        }
    }

    #[test]
    fn lines_terminate_and_some_reach_the_sink() {
        let s = dipole_lines(StreamlinesParams::default());
        assert!(s.lines().iter().all(|l| l.state.is_terminal()));
        assert!(s
            .lines()
            .iter()
            .any(|l| l.state == TraceState::TerminatedAbsorbed));
    }

    #[test]
    fn markers_have_unit_direction_and_bounded_intensity() {
        let s = dipole_lines(StreamlinesParams::default());
        for m in s.markers() {
            assert!((m.direction.length() - 1.0).abs() < 1e-9);
            assert!((0.0..1.0).contains(&m.intensity));
        }
    }

    #[test]
    fn white_palette_colors_everything_white() {
        let s = dipole_lines(StreamlinesParams::default());
        assert!(s.markers().iter().all(|m| m.color.to_hex() == "#ffffff"));
    }

    #[test]
    fn step_leaves_markers_unchanged() {
        let mut s = dipole_lines(StreamlinesParams::default());
        let before = s.markers().to_vec();
        s.step().unwrap();
        assert_eq!(s.markers(), before.as_slice());
    }

    #[test]
    fn construction_is_deterministic() {
        let a = dipole_lines(StreamlinesParams::default());
        let b = dipole_lines(StreamlinesParams::default());
        assert_eq!(a.markers(), b.markers());
    }

    // ---- Params ----

    #[test]
    fn from_json_uses_defaults_for_empty_json() {
        let p = StreamlinesParams::from_json(&json!({})).unwrap();
        assert_eq!(p, StreamlinesParams::default());
    }

    #[test]
    fn from_json_extracts_custom_values() {
        let p = StreamlinesParams::from_json(&json!({
            "line_count": 12,
            "seed_offset": 3.0,
            "palette": "viridis",
            "sample_stride": 1,
            "direction": "backward"
        }))
        .unwrap();
        assert_eq!(p.line_count, 12);
        assert!((p.seed_offset - 3.0).abs() < f64::EPSILON);
        assert_eq!(p.palette, "viridis");
        assert_eq!(p.trace.sample_stride, 1);
        assert_eq!(p.trace.direction, TraceDirection::Backward);
    }

    #[test]
    fn params_round_trip_through_from_json() {
        let params = StreamlinesParams {
            line_count: 7,
            palette: "plasma".to_string(),
            ..StreamlinesParams::default()
        };
        let s = dipole_lines(params.clone());
        assert_eq!(StreamlinesParams::from_json(&s.params()).unwrap(), params);
    }

    #[test]
    fn param_schema_covers_every_param() {
        let s = dipole_lines(StreamlinesParams::default());
        let schema = s.param_schema();
        let params = s.params();
        for key in params.as_object().unwrap().keys() {
            assert!(schema.get(key).is_some(), "schema missing parameter: {key}");
            assert!(schema[key].get("type").is_some(), "{key} missing 'type'");
            assert!(schema[key].get("default").is_some(), "{key} missing 'default'");
        }
    }

    mod proptests {
        use super::*;
        use efield_core::trace::DEFAULT_BOUNDS_RADIUS;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn markers_stay_inside_bounds(
                line_count in 0_usize..24,
                offset in 2.05_f64..4.0,
                stride in 1_usize..6,
            ) {
                let params = StreamlinesParams {
                    line_count,
                    seed_offset: offset,
                    trace: TraceConfig {
                        sample_stride: stride,
                        ..TraceConfig::default()
                    },
                    ..StreamlinesParams::default()
                };
                let s = dipole_lines(params);
                prop_assert_eq!(s.lines().len(), line_count);
                for m in s.markers() {
                    prop_assert!(m.position.length() <= DEFAULT_BOUNDS_RADIUS);
                }
            }
        }
    }
}
