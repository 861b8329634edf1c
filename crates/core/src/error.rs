//! Error types for the field-line core.
//!
//! Field evaluation and tracing never fail: singularities, weak fields and
//! runaway traces all have defined outcomes. Errors only arise when building
//! things from user-supplied configuration.

use thiserror::Error;

/// Errors produced while constructing scenes, grids, palettes and visualizations.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A grid or lattice was requested with a zero-sized axis.
    #[error("invalid dimensions: every grid axis must be non-zero")]
    InvalidDimensions,

    /// A requested visualization name is not registered.
    #[error("unknown visualization: {0}")]
    UnknownVisualization(String),

    /// A parameter was present but its value is unusable (negative step, NaN bound, ...).
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    /// A parameter existed but had the wrong JSON type.
    #[error("parameter type mismatch for '{name}': expected {expected}, got {got}")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    /// The charge set is empty or contains a non-finite charge.
    #[error("invalid charges: {0}")]
    InvalidCharges(String),

    /// A scene description failed validation.
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A palette could not be constructed from the given colors.
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
}

impl FieldError {
    /// Shorthand for [`FieldError::InvalidParam`].
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        FieldError::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
