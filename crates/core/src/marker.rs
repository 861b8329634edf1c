//! Renderer-facing marker records.
//!
//! A marker is everything an instanced cone or arrow needs: where it sits,
//! which way it points, how strong the field is there, and what color to
//! draw it. Converting the direction into a look-at transform, and choosing
//! which end of the mesh is the tip, is left to the renderer.

use crate::color::Srgb;
use crate::palette::Palette;
use crate::trace::StreamlinePoint;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Exponent of the intensity curve; below one it lifts weak-field markers.
const INTENSITY_GAMMA: f64 = 0.75;

/// Field magnitude mapped to half intensity by default.
pub const DEFAULT_REFERENCE_MAGNITUDE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: DVec3,
    /// Unit vector; the marker's facing.
    pub direction: DVec3,
    /// Field strength mapped into [0, 1).
    pub intensity: f64,
    pub color: Srgb,
}

impl Marker {
    /// Builds a marker from a traced point, coloring it by intensity.
    pub fn from_point(point: &StreamlinePoint, reference: f64, palette: &Palette) -> Self {
        let intensity = intensity(point.magnitude, reference);
        Self {
            position: point.position,
            direction: point.direction,
            intensity,
            color: palette.sample(intensity),
        }
    }
}

/// Saturating map from field magnitude to [0, 1): `(m / (m + reference))^0.75`.
///
/// Returns 0 for non-positive or non-finite magnitudes and for a non-positive reference.
pub fn intensity(magnitude: f64, reference: f64) -> f64 {
    if !(magnitude.is_finite() && magnitude > 0.0 && reference > 0.0) {
        return 0.0;
    }
    (magnitude / (magnitude + reference)).powf(INTENSITY_GAMMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_magnitude_maps_below_one() {
        let t = intensity(1.0, 1.0);
        assert!((t - 0.5_f64.powf(0.75)).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_map_to_zero() {
        assert_eq!(intensity(0.0, 1.0), 0.0);
        assert_eq!(intensity(-3.0, 1.0), 0.0);
        assert_eq!(intensity(f64::NAN, 1.0), 0.0);
        assert_eq!(intensity(f64::INFINITY, 1.0), 0.0);
        assert_eq!(intensity(2.0, 0.0), 0.0);
    }

    #[test]
    fn intensity_increases_with_magnitude() {
        let mut prev = 0.0;
        for m in [0.01, 0.1, 1.0, 10.0, 100.0, 1000.0] {
            let t = intensity(m, DEFAULT_REFERENCE_MAGNITUDE);
            assert!(t > prev && t < 1.0, "intensity({m}) = {t}");
            prev = t;
        }
    }

    #[test]
    fn from_point_copies_geometry_and_colors_by_intensity() {
        let point = StreamlinePoint {
            position: DVec3::new(1.0, 2.0, 3.0),
            direction: DVec3::X,
            magnitude: 4.0,
        };
        let palette = Palette::viridis();
        let m = Marker::from_point(&point, 1.0, &palette);
        assert_eq!(m.position, point.position);
        assert_eq!(m.direction, DVec3::X);
        assert!((m.intensity - intensity(4.0, 1.0)).abs() < 1e-12);
        assert_eq!(m.color, palette.sample(m.intensity));
    }
}
