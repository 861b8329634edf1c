//! Point charges: the only sources of field in a scene.

use crate::error::FieldError;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Radius of the rendered charge spheres in the default scene. Seeds for
/// traced lines start just outside this surface.
pub const CHARGE_SURFACE_RADIUS: f64 = 2.0;

/// An immutable point charge: a position and a signed magnitude.
///
/// Positive charges are sources (field lines leave them), negative charges
/// are sinks (field lines end on them). Magnitudes carry no physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub position: DVec3,
    pub magnitude: f64,
}

impl Charge {
    pub fn new(position: DVec3, magnitude: f64) -> Self {
        Self {
            position,
            magnitude,
        }
    }

    /// True for strictly positive magnitudes.
    pub fn is_source(&self) -> bool {
        self.magnitude > 0.0
    }

    /// True for strictly negative magnitudes.
    pub fn is_sink(&self) -> bool {
        self.magnitude < 0.0
    }

    /// Euclidean distance from this charge to `point`.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        self.position.distance(point)
    }
}

/// The two-charge scene used throughout the visualizations: a +1 source at
/// (-8, 0, 0) and a -1 sink at (8, 0, 0).
pub fn dipole() -> Vec<Charge> {
    vec![
        Charge::new(DVec3::new(-8.0, 0.0, 0.0), 1.0),
        Charge::new(DVec3::new(8.0, 0.0, 0.0), -1.0),
    ]
}

/// Checks that a charge set is non-empty and every component is finite.
pub fn validate_charges(charges: &[Charge]) -> Result<(), FieldError> {
    if charges.is_empty() {
        return Err(FieldError::InvalidCharges(
            "at least one charge is required".to_string(),
        ));
    }
    if let Some(i) = charges
        .iter()
        .position(|c| !c.position.is_finite() || !c.magnitude.is_finite())
    {
        return Err(FieldError::InvalidCharges(format!(
            "charge {i} has a non-finite position or magnitude"
        )));
    }
    Ok(())
}

/// Distance from `point` to the closest charge, or `f64::INFINITY` for an empty set.
pub fn nearest_charge_distance(point: DVec3, charges: &[Charge]) -> f64 {
    charges
        .iter()
        .map(|c| c.distance_to(point))
        .fold(f64::INFINITY, f64::min)
}
