#![deny(unsafe_code)]
//! Arrow-field visualization.
//!
//! Samples the field once at each seed and places an arrow there, pointing
//! along the field and colored by its strength. Seeds come either from
//! uniform random sampling of the bounds ball or from a cylindrical lattice
//! around an axis. Seeds inside a charge's exclusion shell, or where the
//! field is too weak to define a direction, produce no arrow.

use efield_core::charge::{nearest_charge_distance, validate_charges, Charge};
use efield_core::error::FieldError;
use efield_core::evaluator::{validate_k, FieldEvaluator};
use efield_core::marker::{Marker, DEFAULT_REFERENCE_MAGNITUDE};
use efield_core::palette::Palette;
use efield_core::params::{param_f64, param_string, param_usize, param_vec3};
use efield_core::prng::Xorshift64;
use efield_core::seeding::{volume_seeds, CylinderLattice};
use efield_core::trace::{
    StreamlinePoint, DEFAULT_BOUNDS_RADIUS, DEFAULT_MIN_FIELD_MAGNITUDE,
};
use efield_core::Visualization;
use glam::DVec3;
use serde_json::{json, Value};

/// Default number of arrows requested.
const DEFAULT_COUNT: usize = 2400;
/// Largest accepted `count`.
pub const MAX_COUNT: usize = 20_000;
/// Default clearance kept around every charge.
const DEFAULT_EXCLUSION_RADIUS: f64 = 2.5;
const DEFAULT_PALETTE: &str = "viridis";

/// Where arrow seeds come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrowSeeding {
    /// Uniform random points in the bounds ball, away from charges.
    #[default]
    Volume,
    /// A regular `(r, θ, h)` lattice around an axis.
    Cylinder,
}

impl ArrowSeeding {
    pub fn from_name(name: &str) -> Result<Self, FieldError> {
        match name {
            "volume" => Ok(ArrowSeeding::Volume),
            "cylinder" => Ok(ArrowSeeding::Cylinder),
            other => Err(FieldError::invalid_param(
                "seeding",
                format!("expected \"volume\" or \"cylinder\", got \"{other}\""),
            )),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrowSeeding::Volume => "volume",
            ArrowSeeding::Cylinder => "cylinder",
        }
    }
}

/// Tunables for [`Arrows`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowsParams {
    pub seeding: ArrowSeeding,
    /// Target number of seeds. Volume seeding draws exactly this many; the
    /// lattice sizes its axes from it.
    pub count: usize,
    pub bounds_radius: f64,
    /// Seeds closer than this to any charge are skipped.
    pub exclusion_radius: f64,
    pub min_field_magnitude: f64,
    pub palette: String,
    pub reference_magnitude: f64,
    /// Lattice shape for cylinder seeding. Its `count` is replaced by [`ArrowsParams::count`].
    pub lattice: CylinderLattice,
}

impl Default for ArrowsParams {
    fn default() -> Self {
        Self {
            seeding: ArrowSeeding::Volume,
            count: DEFAULT_COUNT,
            bounds_radius: DEFAULT_BOUNDS_RADIUS,
            exclusion_radius: DEFAULT_EXCLUSION_RADIUS,
            min_field_magnitude: DEFAULT_MIN_FIELD_MAGNITUDE,
            palette: DEFAULT_PALETTE.to_string(),
            reference_magnitude: DEFAULT_REFERENCE_MAGNITUDE,
            lattice: CylinderLattice::default(),
        }
    }
}

impl ArrowsParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Result<Self, FieldError> {
        let lattice_default = CylinderLattice::default();
        Ok(Self {
            seeding: ArrowSeeding::from_name(&param_string(params, "seeding", "volume"))?,
            count: param_usize(params, "count", DEFAULT_COUNT),
            bounds_radius: param_f64(params, "bounds_radius", DEFAULT_BOUNDS_RADIUS),
            exclusion_radius: param_f64(params, "exclusion_radius", DEFAULT_EXCLUSION_RADIUS),
            min_field_magnitude: param_f64(
                params,
                "min_field_magnitude",
                DEFAULT_MIN_FIELD_MAGNITUDE,
            ),
            palette: param_string(params, "palette", DEFAULT_PALETTE),
            reference_magnitude: param_f64(
                params,
                "reference_magnitude",
                DEFAULT_REFERENCE_MAGNITUDE,
            ),
            lattice: CylinderLattice {
                count: lattice_default.count,
                r_min: param_f64(params, "r_min", lattice_default.r_min),
                r_max: param_f64(params, "r_max", lattice_default.r_max),
                h_min: param_f64(params, "h_min", lattice_default.h_min),
                h_max: param_f64(params, "h_max", lattice_default.h_max),
                axis: param_vec3(params, "axis", lattice_default.axis),
            },
        })
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        if self.count > MAX_COUNT {
            return Err(FieldError::invalid_param(
                "count",
                format!("must be at most {MAX_COUNT}"),
            ));
        }
        if !(self.bounds_radius.is_finite() && self.bounds_radius > 0.0) {
            return Err(FieldError::invalid_param(
                "bounds_radius",
                "must be finite and positive",
            ));
        }
        if !(self.exclusion_radius.is_finite() && self.exclusion_radius >= 0.0) {
            return Err(FieldError::invalid_param(
                "exclusion_radius",
                "must be finite and non-negative",
            ));
        }
        if !(self.min_field_magnitude.is_finite() && self.min_field_magnitude >= 0.0) {
            return Err(FieldError::invalid_param(
                "min_field_magnitude",
                "must be finite and non-negative",
            ));
        }
        if !(self.reference_magnitude.is_finite() && self.reference_magnitude > 0.0) {
            return Err(FieldError::invalid_param(
                "reference_magnitude",
                "must be finite and positive",
            ));
        }
        self.lattice.validate()
    }

    pub fn to_json(&self) -> Value {
        let axis = self.lattice.axis;
        json!({
            "seeding": self.seeding.name(),
            "count": self.count,
            "bounds_radius": self.bounds_radius,
            "exclusion_radius": self.exclusion_radius,
            "min_field_magnitude": self.min_field_magnitude,
            "palette": self.palette,
            "reference_magnitude": self.reference_magnitude,
            "r_min": self.lattice.r_min,
            "r_max": self.lattice.r_max,
            "h_min": self.lattice.h_min,
            "h_max": self.lattice.h_max,
            "axis": [axis.x, axis.y, axis.z],
        })
    }

    /// Seed points for this configuration. Only volume seeding draws from `rng`.
    pub fn seeds(&self, rng: &mut Xorshift64, charges: &[Charge]) -> Vec<DVec3> {
        match self.seeding {
            ArrowSeeding::Volume => volume_seeds(
                rng,
                charges,
                self.count,
                self.bounds_radius,
                self.exclusion_radius,
            ),
            ArrowSeeding::Cylinder => CylinderLattice {
                count: self.count,
                ..self.lattice
            }
            .points(),
        }
    }
}

/// One arrow per usable seed, sampled once.
pub struct Arrows {
    charges: Vec<Charge>,
    k: f64,
    seed: u64,
    params: ArrowsParams,
    seed_count: usize,
    markers: Vec<Marker>,
}

impl Arrows {
    /// Seeds and samples the arrow field.
    ///
    /// `seed` drives volume seeding; the same seed always yields the same arrows.
    pub fn new(
        charges: Vec<Charge>,
        k: f64,
        seed: u64,
        params: ArrowsParams,
    ) -> Result<Self, FieldError> {
        validate_charges(&charges)?;
        validate_k(k)?;
        params.validate()?;
        let palette = Palette::from_name(&params.palette)?;

        let mut rng = Xorshift64::new(seed);
        let seeds = params.seeds(&mut rng, &charges);
        let evaluator = FieldEvaluator::new(&charges, k);
        let markers: Vec<Marker> = seeds
            .iter()
            .filter_map(|&p| sample_arrow(p, evaluator, &params, &palette))
            .collect();
        log::debug!(
            "arrows: {} {} seeds, {} markers",
            seeds.len(),
            params.seeding.name(),
            markers.len()
        );

        Ok(Self {
            charges,
            k,
            seed,
            params,
            seed_count: seeds.len(),
            markers,
        })
    }

    /// Creates the visualization from a JSON params object.
    pub fn from_json(
        charges: Vec<Charge>,
        k: f64,
        seed: u64,
        json_params: &Value,
    ) -> Result<Self, FieldError> {
        Self::new(charges, k, seed, ArrowsParams::from_json(json_params)?)
    }

    /// Seeds considered, including the skipped ones.
    pub fn seed_count(&self) -> usize {
        self.seed_count
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// The arrow at `point`, or `None` inside an exclusion shell or in a weak field.
fn sample_arrow(
    point: DVec3,
    evaluator: FieldEvaluator<'_>,
    params: &ArrowsParams,
    palette: &Palette,
) -> Option<Marker> {
    if nearest_charge_distance(point, evaluator.charges()) < params.exclusion_radius {
        return None;
    }
    let (direction, magnitude) = evaluator.direction(point);
    if magnitude < params.min_field_magnitude || magnitude == 0.0 {
        return None;
    }
    let sample = StreamlinePoint {
        position: point,
        direction,
        magnitude,
    };
    Some(Marker::from_point(
        &sample,
        params.reference_magnitude,
        palette,
    ))
}

impl Visualization for Arrows {
    /// Static: the field is sampled once at construction.
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
        let lattice = CylinderLattice::default();
        json!({
            "seeding": {
                "type": "string",
                "default": "volume",
                "options": ["volume", "cylinder"],
                "description": "Random points in the bounds ball, or a cylindrical lattice"
            },
            "count": {
                "type": "integer",
                "default": DEFAULT_COUNT,
                "min": 0,
                "max": MAX_COUNT,
                "description": "Target number of arrows"
            },
            "bounds_radius": {
                "type": "number",
                "default": DEFAULT_BOUNDS_RADIUS,
                "min": 1.0,
                "max": 500.0,
                "description": "Radius of the volume seeded with arrows"
            },
            "exclusion_radius": {
                "type": "number",
                "default": DEFAULT_EXCLUSION_RADIUS,
                "min": 0.0,
                "max": 10.0,
                "description": "Clearance kept around every charge"
            },
            "min_field_magnitude": {
                "type": "number",
                "default": DEFAULT_MIN_FIELD_MAGNITUDE,
                "min": 0.0,
                "max": 10.0,
                "description": "Field magnitude below which no arrow is drawn"
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
            },
            "r_min": {
                "type": "number",
                "default": lattice.r_min,
                "min": 0.0,
                "max": 50.0,
                "description": "Inner lattice radius (cylinder seeding)"
            },
            "r_max": {
                "type": "number",
                "default": lattice.r_max,
                "min": 0.0,
                "max": 50.0,
                "description": "Outer lattice radius (cylinder seeding)"
            },
            "h_min": {
                "type": "number",
                "default": lattice.h_min,
                "min": -100.0,
                "max": 100.0,
                "description": "Lowest lattice height along the axis (cylinder seeding)"
            },
            "h_max": {
                "type": "number",
                "default": lattice.h_max,
                "min": -100.0,
                "max": 100.0,
                "description": "Highest lattice height along the axis (cylinder seeding)"
            },
            "axis": {
                "type": "vec3",
                "default": [lattice.axis.x, lattice.axis.y, lattice.axis.z],
                "description": "Lattice axis direction (cylinder seeding)"
            }
        })
    }
}
