//! Coulomb field and potential evaluation with singularity handling.
//!
//! Both forms superpose per-charge contributions. Near a charge the inverse
//! power laws blow up, so each form has a defined substitute: the vector form
//! drops the contribution, the potential form saturates it to a signed
//! constant. Neither ever returns infinity or NaN for finite inputs.

use crate::charge::Charge;
use crate::error::FieldError;
use glam::DVec3;

/// Default visualization scale constant `k`.
pub const DEFAULT_COULOMB_K: f64 = 100.0;

/// Squared distance at or below which a charge contributes nothing to the field vector.
pub const SOFTENING_RADIUS_SQ: f64 = 0.1;

/// Distance below which a charge's potential contribution saturates.
pub const MIN_POTENTIAL_RADIUS: f64 = 0.01;

/// Magnitude of a saturated potential contribution.
pub const POTENTIAL_SATURATION: f64 = 1000.0;

/// Rejects a non-finite scale constant. Zero and negative values are allowed.
pub fn validate_k(k: f64) -> Result<(), FieldError> {
    if k.is_finite() {
        Ok(())
    } else {
        Err(FieldError::invalid_param("k", format!("must be finite, got {k}")))
    }
}

/// Superposed field vector at `point`.
///
/// Each charge contributes `k * q * r / |r|^3` with `r = point - position`,
/// except when `|r|^2 <= SOFTENING_RADIUS_SQ`, where it contributes zero.
/// A zero result means the field is undefined or too weak at `point`.
pub fn field_at(point: DVec3, charges: &[Charge], k: f64) -> DVec3 {
    charges.iter().fold(DVec3::ZERO, |acc, c| {
        let r = point - c.position;
        let d2 = r.length_squared();
        if d2 <= SOFTENING_RADIUS_SQ {
            return acc;
        }
        acc + r * (k * c.magnitude / (d2 * d2.sqrt()))
    })
}

/// Superposed scalar potential at `point`.
///
/// Each charge contributes `k * q / |r|`. Within [`MIN_POTENTIAL_RADIUS`] of a
/// charge the contribution is `±POTENTIAL_SATURATION` with the sign of `q`.
pub fn potential_at(point: DVec3, charges: &[Charge], k: f64) -> f64 {
    charges
        .iter()
        .map(|c| {
            let d = (point - c.position).length();
            if d < MIN_POTENTIAL_RADIUS {
                saturated(c.magnitude)
            } else {
                k * c.magnitude / d
            }
        })
        .sum()
}

fn saturated(magnitude: f64) -> f64 {
    if magnitude > 0.0 {
        POTENTIAL_SATURATION
    } else if magnitude < 0.0 {
        -POTENTIAL_SATURATION
    } else {
        0.0
    }
}

/// A borrowed charge set paired with its scale constant.
///
/// Saves threading `(charges, k)` through every call in the tracer and the
/// visualization engines.
#[derive(Debug, Clone, Copy)]
pub struct FieldEvaluator<'a> {
    charges: &'a [Charge],
    k: f64,
}

impl<'a> FieldEvaluator<'a> {
    pub fn new(charges: &'a [Charge], k: f64) -> Self {
        Self { charges, k }
    }

    pub fn charges(&self) -> &'a [Charge] {
        self.charges
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Field vector at `point`. See [`field_at`].
    pub fn field(&self, point: DVec3) -> DVec3 {
        field_at(point, self.charges, self.k)
    }

    /// Scalar potential at `point`. See [`potential_at`].
    pub fn potential(&self, point: DVec3) -> f64 {
        potential_at(point, self.charges, self.k)
    }

    /// Unit field direction and field magnitude at `point`.
    ///
    /// The direction is zero when the magnitude is zero.
    pub fn direction(&self, point: DVec3) -> (DVec3, f64) {
        let e = self.field(point);
        let m = e.length();
        if m > 0.0 {
            (e / m, m)
        } else {
            (DVec3::ZERO, 0.0)
        }
    }
}
