//! Color ramps for mapping field intensity to marker colors.

use crate::color::{LinearRgb, Srgb};
use crate::error::FieldError;

/// Names accepted by [`Palette::from_name`].
const PALETTE_NAMES: &[&str] = &["viridis", "plasma", "white", "monochrome"];

/// Evenly spaced color stops, sampled by linear-RGB interpolation.
///
/// `sample(0.0)` is the first stop and `sample(1.0)` the last.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<LinearRgb>,
}

impl Palette {
    pub fn new(stops: Vec<Srgb>) -> Result<Self, FieldError> {
        if stops.is_empty() {
            return Err(FieldError::InvalidPalette(
                "palette requires at least 1 color".to_string(),
            ));
        }
        Ok(Self {
            stops: stops.into_iter().map(Srgb::to_linear).collect(),
        })
    }

    pub fn from_hex(hexes: &[&str]) -> Result<Self, FieldError> {
        let stops = hexes
            .iter()
            .map(|h| Srgb::from_hex(h))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stops)
    }

    /// Looks up a built-in palette.
    pub fn from_name(name: &str) -> Result<Self, FieldError> {
        match name {
            "viridis" => Ok(Self::viridis()),
            "plasma" => Ok(Self::plasma()),
            "white" => Ok(Self::white()),
            "monochrome" => Ok(Self::monochrome()),
            other => Err(FieldError::InvalidPalette(format!(
                "unknown palette \"{other}\", expected one of {}",
                PALETTE_NAMES.join(", ")
            ))),
        }
    }

    pub fn list_names() -> &'static [&'static str] {
        PALETTE_NAMES
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Always false for a constructed palette.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Samples at `t`, clamped to [0, 1]. NaN samples the first stop.
    pub fn sample(&self, t: f64) -> Srgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let n = self.stops.len();
        if n == 1 {
            return self.stops[0].to_srgb();
        }
        let scaled = t * (n - 1) as f64;
        let idx = (scaled as usize).min(n - 2);
        let frac = scaled - idx as f64;
        self.stops[idx].lerp(self.stops[idx + 1], frac).to_srgb()
    }

    /// Dark purple through teal to yellow.
    pub fn viridis() -> Self {
        Self::from_hex(&["#440154", "#21918c", "#fde725"])
            .expect("viridis palette hex values are valid")
    }

    /// Deep blue through magenta to yellow.
    pub fn plasma() -> Self {
        Self::from_hex(&["#0d0887", "#cc4778", "#f0f921"])
            .expect("plasma palette hex values are valid")
    }

    /// Constant white, for uncolored cones.
    pub fn white() -> Self {
        Self::from_hex(&["#ffffff"]).expect("white palette hex value is valid")
    }

    pub fn monochrome() -> Self {
        Self::from_hex(&["#000000", "#ffffff"]).expect("monochrome palette hex values are valid")
    }
}
