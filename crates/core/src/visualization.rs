//! The `Visualization` trait every field visualization implements.
//!
//! The trait is object-safe so visualizations can be held as
//! `Box<dyn Visualization>` and switched at runtime.

use crate::charge::Charge;
use crate::error::FieldError;
use crate::marker::Marker;
use serde_json::Value;

/// A step-driven producer of renderer markers for a fixed set of charges.
///
/// Static visualizations compute their markers at construction and treat
/// `step` as a no-op; animated ones advance their state each call.
pub trait Visualization {
    /// Advance by one frame.
    fn step(&mut self) -> Result<(), FieldError>;

    /// Markers for the current frame, in a stable order.
    fn markers(&self) -> &[Marker];

    /// The charges this visualization was built over.
    fn charges(&self) -> &[Charge];

    /// Current parameter values as a JSON object.
    fn params(&self) -> Value;

    /// Schema describing all available parameters, their types, ranges, and defaults.
    fn param_schema(&self) -> Value;
}
