//! Flat `f32` buffers for instanced rendering.
//!
//! Renderers upload these straight into instance attributes, so the layout
//! is fixed: [`INSTANCE_STRIDE`] floats per marker, [`CHARGE_STRIDE`] per charge.

use efield_core::charge::Charge;
use efield_core::error::FieldError;
use efield_core::grid::PotentialGrid;
use efield_core::marker::Marker;
use glam::DVec3;

/// Floats per marker: `[px, py, pz, dx, dy, dz, intensity, r, g, b]`.
pub const INSTANCE_STRIDE: usize = 10;

/// Floats per charge: `[x, y, z, q]`.
pub const CHARGE_STRIDE: usize = 4;

/// Packs markers in order, [`INSTANCE_STRIDE`] floats each. Colors are sRGB in [0, 1].
pub fn instance_buffer(markers: &[Marker]) -> Vec<f32> {
    let mut out = Vec::with_capacity(markers.len() * INSTANCE_STRIDE);
    write_instances(markers, &mut out);
    out
}

/// Like [`instance_buffer`] but reuses `out`, replacing its contents.
pub fn write_instances(markers: &[Marker], out: &mut Vec<f32>) {
    out.clear();
    out.extend(markers.iter().flat_map(|m| {
        [
            m.position.x as f32,
            m.position.y as f32,
            m.position.z as f32,
            m.direction.x as f32,
            m.direction.y as f32,
            m.direction.z as f32,
            m.intensity as f32,
            m.color.r as f32,
            m.color.g as f32,
            m.color.b as f32,
        ]
    }));
}

/// Packs charges as `[x, y, z, q]` for drawing the charge spheres.
pub fn charge_buffer(charges: &[Charge]) -> Vec<f32> {
    charges
        .iter()
        .flat_map(|c| {
            [
                c.position.x as f32,
                c.position.y as f32,
                c.position.z as f32,
                c.magnitude as f32,
            ]
        })
        .collect()
}

/// Parses a flat `[x, y, z, q, ...]` list into charges.
///
/// Returns `FieldError::InvalidCharges` if the length is not a multiple of
/// [`CHARGE_STRIDE`].
pub fn charges_from_flat(flat: &[f64]) -> Result<Vec<Charge>, FieldError> {
    if flat.len() % CHARGE_STRIDE != 0 {
        return Err(FieldError::InvalidCharges(format!(
            "flat charge list length {} is not a multiple of {CHARGE_STRIDE}",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(CHARGE_STRIDE)
        .map(|c| Charge::new(DVec3::new(c[0], c[1], c[2]), c[3]))
        .collect())
}

/// Grid values narrowed to `f32`, in the grid's x-fastest order.
pub fn potential_buffer(grid: &PotentialGrid) -> Vec<f32> {
    grid.data().iter().map(|&v| v as f32).collect()
}
