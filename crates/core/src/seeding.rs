//! Seed-point strategies for tracing and single-sample markers.
//!
//! - [`fibonacci_sphere`]: deterministic, even angular coverage around a charge.
//! - [`sample_volume`]: uniform-in-volume random points with rejection near
//!   charges, retried a bounded number of times.
//! - [`CylinderLattice`]: a regular `(r, θ, h)` lattice around an axis, for
//!   line-charge style arrow fields.

use crate::charge::{nearest_charge_distance, Charge};
use crate::error::FieldError;
use crate::prng::Xorshift64;
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// `π (3 - √5)`, the angular increment between successive Fibonacci-sphere points.
pub const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Retry budget for [`sample_volume`] before it falls back.
pub const MAX_SEED_ATTEMPTS: usize = 64;

/// `n` points spread over the sphere of `radius` around `center`.
///
/// Point `i` sits at height `y = 1 - 2i/(n-1)` on the unit sphere, at azimuth
/// `i * GOLDEN_ANGLE`, so both poles are included and no two points share an
/// azimuth. A single point lands on the north pole.
pub fn fibonacci_sphere(center: DVec3, radius: f64, n: usize) -> Vec<DVec3> {
    let denom = n.saturating_sub(1).max(1) as f64;
    (0..n)
        .map(|i| {
            let y = 1.0 - (i as f64 / denom) * 2.0;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = GOLDEN_ANGLE * i as f64;
            center + DVec3::new(theta.cos() * ring, y, theta.sin() * ring) * radius
        })
        .collect()
}

/// A uniformly distributed point inside the ball of radius `bounds` around the origin.
///
/// The radius is `bounds * u^(1/3)` so density is uniform in volume rather than in radius.
pub fn random_in_ball(rng: &mut Xorshift64, bounds: f64) -> DVec3 {
    let r = bounds * rng.next_f64().cbrt();
    let theta = rng.next_range(0.0, TAU);
    let phi = (2.0 * rng.next_f64() - 1.0).clamp(-1.0, 1.0).acos();
    DVec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

/// Result of a bounded rejection-sampling run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeSample {
    /// A candidate outside every exclusion shell.
    Accepted(DVec3),
    /// Every attempt was rejected; this is the candidate farthest from its nearest charge.
    Fallback(DVec3),
}

impl VolumeSample {
    pub fn point(self) -> DVec3 {
        match self {
            VolumeSample::Accepted(p) | VolumeSample::Fallback(p) => p,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, VolumeSample::Fallback(_))
    }
}

/// Draws a point uniformly in the bounds ball that is at least
/// `exclusion_radius` from every charge.
///
/// Gives up after [`MAX_SEED_ATTEMPTS`] rejections and returns the best
/// candidate seen, so degenerate scenes (exclusion shells covering the whole
/// ball) still produce a point.
pub fn sample_volume(
    rng: &mut Xorshift64,
    charges: &[Charge],
    bounds_radius: f64,
    exclusion_radius: f64,
) -> VolumeSample {
    let mut best = DVec3::ZERO;
    let mut best_clearance = f64::NEG_INFINITY;
    for _ in 0..MAX_SEED_ATTEMPTS {
        let candidate = random_in_ball(rng, bounds_radius);
        let clearance = nearest_charge_distance(candidate, charges);
        if clearance >= exclusion_radius {
            return VolumeSample::Accepted(candidate);
        }
        if clearance > best_clearance {
            best = candidate;
            best_clearance = clearance;
        }
    }
    log::warn!(
        "no seed outside exclusion radius {exclusion_radius} after {MAX_SEED_ATTEMPTS} attempts; \
         using best candidate at clearance {best_clearance:.3}"
    );
    VolumeSample::Fallback(best)
}

/// `count` points drawn with [`sample_volume`].
pub fn volume_seeds(
    rng: &mut Xorshift64,
    charges: &[Charge],
    count: usize,
    bounds_radius: f64,
    exclusion_radius: f64,
) -> Vec<DVec3> {
    (0..count)
        .map(|_| sample_volume(rng, charges, bounds_radius, exclusion_radius).point())
        .collect()
}

/// Reference point count for the lattice density scaler.
const LATTICE_REFERENCE_COUNT: f64 = 2400.0;

/// A regular cylindrical lattice of sample points.
///
/// Axis counts follow the target `count`: with `s = (count / 2400)^(1/3)` the
/// lattice has `⌊20s⌋` heights, `⌊20s⌋` azimuths and `⌊6s⌋` radii (a zero
/// count falls back to 5, 8 and 3 respectively). The lattice is laid out
/// around +Y and then rotated onto `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CylinderLattice {
    pub count: usize,
    pub r_min: f64,
    pub r_max: f64,
    pub h_min: f64,
    pub h_max: f64,
    pub axis: DVec3,
}

impl Default for CylinderLattice {
    fn default() -> Self {
        Self {
            count: 1000,
            r_min: 0.05,
            r_max: 3.0,
            h_min: -3.5,
            h_max: 3.5,
            axis: DVec3::X,
        }
    }
}

impl CylinderLattice {
    /// `(radii, azimuths, heights)` for the configured count.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        let s = (self.count as f64 / LATTICE_REFERENCE_COUNT).cbrt();
        let floor_or = |v: f64, fallback: usize| match v.floor() as usize {
            0 => fallback,
            n => n,
        };
        (floor_or(6.0 * s, 3), floor_or(20.0 * s, 8), floor_or(20.0 * s, 5))
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        if !(self.r_min.is_finite() && self.r_max.is_finite() && self.r_min <= self.r_max) {
            return Err(FieldError::invalid_param(
                "r_min",
                "radius range must be finite with r_min <= r_max",
            ));
        }
        if !(self.h_min.is_finite() && self.h_max.is_finite() && self.h_min <= self.h_max) {
            return Err(FieldError::invalid_param(
                "h_min",
                "height range must be finite with h_min <= h_max",
            ));
        }
        if !self.axis.is_finite() || self.axis.length_squared() == 0.0 {
            return Err(FieldError::invalid_param(
                "axis",
                "must be a finite non-zero vector",
            ));
        }
        Ok(())
    }

    /// Lattice points, radius-major then azimuth then height.
    pub fn points(&self) -> Vec<DVec3> {
        let (r_count, t_count, h_count) = self.dimensions();
        let axis = self.axis.try_normalize().unwrap_or(DVec3::Y);
        let rotation = DQuat::from_rotation_arc(DVec3::Y, axis);
        let lerp = |lo: f64, hi: f64, i: usize, n: usize| {
            lo + (i as f64 / n.saturating_sub(1).max(1) as f64) * (hi - lo)
        };

        let mut out = Vec::with_capacity(r_count * t_count * h_count);
        for ri in 0..r_count {
            let r = lerp(self.r_min, self.r_max, ri, r_count);
            for ti in 0..t_count {
                let theta = (ti as f64 / t_count as f64) * TAU;
                for hi in 0..h_count {
                    let h = lerp(self.h_min, self.h_max, hi, h_count);
                    let local = DVec3::new(r * theta.cos(), h, r * theta.sin());
                    out.push(rotation * local);
                }
            }
        }
        out
    }
}
