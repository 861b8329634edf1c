#![deny(unsafe_code)]
//! Core types for the electrostatic field-line engine.
//!
//! Provides the Coulomb field evaluator, the Euler streamline tracer, seeding
//! strategies, the `Visualization` trait, `Marker` records, `Palette` and
//! color types, the potential grid, the `Xorshift64` PRNG, `Scene`, and
//! parameter helpers.

pub mod charge;
pub mod color;
pub mod error;
pub mod evaluator;
pub mod grid;
pub mod marker;
pub mod palette;
pub mod params;
pub mod prng;
pub mod scene;
pub mod seeding;
pub mod trace;
pub mod visualization;

pub use charge::Charge;
pub use color::{LinearRgb, Srgb};
pub use error::FieldError;
pub use evaluator::FieldEvaluator;
pub use grid::PotentialGrid;
pub use marker::Marker;
pub use palette::Palette;
pub use prng::Xorshift64;
pub use scene::Scene;
pub use trace::{
    euler_step, Boundary, StepOutcome, Streamline, StreamlinePoint, Trace, TraceConfig,
    TraceDirection, TraceState,
};
pub use visualization::Visualization;
