//! Regular 3D lattice of scalar potential samples.
//!
//! The renderer extracts equipotential surfaces from this grid; the grid
//! itself only stores values. Layout is x-fastest: index `x + nx * (y + ny * z)`.

use crate::charge::Charge;
use crate::error::FieldError;
use crate::evaluator::potential_at;
use glam::DVec3;

/// Potential values sampled on an axis-aligned lattice between `min` and `max`.
#[derive(Debug, Clone)]
pub struct PotentialGrid {
    dims: [usize; 3],
    min: DVec3,
    max: DVec3,
    data: Vec<f64>,
}

impl PotentialGrid {
    /// Samples the potential of `charges` at every lattice node.
    ///
    /// Returns `FieldError::InvalidDimensions` if any axis is zero or the node
    /// count overflows, and `FieldError::InvalidParam` if the box is not finite.
    pub fn sample(
        charges: &[Charge],
        k: f64,
        min: DVec3,
        max: DVec3,
        dims: [usize; 3],
    ) -> Result<Self, FieldError> {
        let len = checked_len(dims)?;
        if !min.is_finite() || !max.is_finite() {
            return Err(FieldError::invalid_param("min", "grid box must be finite"));
        }
        let mut grid = Self {
            dims,
            min,
            max,
            data: Vec::with_capacity(len),
        };
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let p = grid.node_position(x, y, z);
                    grid.data.push(potential_at(p, charges, k));
                }
            }
        }
        log::debug!(
            "sampled potential grid {}x{}x{} over {} charges",
            dims[0],
            dims[1],
            dims[2],
            charges.len()
        );
        Ok(grid)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn bounds(&self) -> (DVec3, DVec3) {
        (self.min, self.max)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at a lattice node, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        let [nx, ny, nz] = self.dims;
        (x < nx && y < ny && z < nz).then(|| self.data[x + nx * (y + ny * z)])
    }

    /// World-space position of a lattice node. Single-node axes sit at `min`.
    pub fn node_position(&self, x: usize, y: usize, z: usize) -> DVec3 {
        let frac = |i: usize, n: usize| {
            if n <= 1 {
                0.0
            } else {
                i as f64 / (n - 1) as f64
            }
        };
        let t = DVec3::new(
            frac(x, self.dims[0]),
            frac(y, self.dims[1]),
            frac(z, self.dims[2]),
        );
        self.min + (self.max - self.min) * t
    }

    /// Smallest and largest sampled values.
    pub fn value_range(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// `count` potential levels evenly spaced strictly inside the sampled range.
    pub fn iso_levels(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = self.value_range();
        (1..=count)
            .map(|i| lo + (hi - lo) * i as f64 / (count + 1) as f64)
            .collect()
    }
}

fn checked_len(dims: [usize; 3]) -> Result<usize, FieldError> {
    if dims.contains(&0) {
        return Err(FieldError::InvalidDimensions);
    }
    dims[0]
        .checked_mul(dims[1])
        .and_then(|v| v.checked_mul(dims[2]))
        .ok_or(FieldError::InvalidDimensions)
}
