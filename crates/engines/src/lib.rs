#![deny(unsafe_code)]
//! Visualization registry: maps visualization names to implementations and
//! packs their markers for instanced rendering.
//!
//! This crate sits between `efield-core` (which defines the `Visualization`
//! trait) and the individual visualization crates. The WASM bindings depend
//! on it so dispatch logic lives in one place.

pub mod instance;

use efield_arrows::Arrows;
use efield_core::charge::Charge;
use efield_core::error::FieldError;
use efield_core::marker::Marker;
use efield_core::scene::Scene;
use efield_core::Visualization;
use efield_flow::Flow;
use efield_streamlines::Streamlines;
use serde_json::Value;

/// All available visualization names.
const VISUALIZATION_NAMES: &[&str] = &["streamlines", "arrows", "flow"];

/// Enumeration of all available visualizations.
///
/// Wraps each implementation and delegates `Visualization` trait methods.
/// Use [`VisualizationKind::from_name`] for string-based construction.
pub enum VisualizationKind {
    /// Field lines traced from Fibonacci seeds around each source.
    Streamlines(Streamlines),
    /// One single-sample arrow per seed.
    Arrows(Arrows),
    /// Resident particles advected every frame.
    Flow(Flow),
}

impl VisualizationKind {
    /// Constructs a visualization by name.
    ///
    /// `seed` drives every random choice; streamlines ignore it.
    /// Returns `FieldError::UnknownVisualization` if the name is not recognized.
    pub fn from_name(
        name: &str,
        charges: Vec<Charge>,
        k: f64,
        seed: u64,
        params: &Value,
    ) -> Result<Self, FieldError> {
        let vis = match name {
            "streamlines" => {
                VisualizationKind::Streamlines(Streamlines::from_json(charges, k, params)?)
            }
            "arrows" => VisualizationKind::Arrows(Arrows::from_json(charges, k, seed, params)?),
            "flow" => VisualizationKind::Flow(Flow::from_json(charges, k, seed, params)?),
            _ => return Err(FieldError::UnknownVisualization(name.to_string())),
        };
        log::debug!(
            "built {name} visualization with {} markers",
            vis.markers().len()
        );
        Ok(vis)
    }

    /// Validates `scene`, builds its visualization and steps it `scene.steps` times.
    pub fn from_scene(scene: &Scene) -> Result<Self, FieldError> {
        scene.validate()?;
        let mut vis = Self::from_name(
            &scene.visualization,
            scene.charges.clone(),
            scene.k,
            scene.seed,
            &scene.params,
        )?;
        for _ in 0..scene.steps {
            vis.step()?;
        }
        Ok(vis)
    }

    /// Returns a slice of all recognized visualization names.
    pub fn list_visualizations() -> &'static [&'static str] {
        VISUALIZATION_NAMES
    }

    pub fn name(&self) -> &'static str {
        match self {
            VisualizationKind::Streamlines(_) => "streamlines",
            VisualizationKind::Arrows(_) => "arrows",
            VisualizationKind::Flow(_) => "flow",
        }
    }
}

impl Visualization for VisualizationKind {
    fn step(&mut self) -> Result<(), FieldError> {
        match self {
            VisualizationKind::Streamlines(v) => v.step(),
            VisualizationKind::Arrows(v) => v.step(),
            VisualizationKind::Flow(v) => v.step(),
        }
    }

    fn markers(&self) -> &[Marker] {
        match self {
            VisualizationKind::Streamlines(v) => v.markers(),
            VisualizationKind::Arrows(v) => v.markers(),
            VisualizationKind::Flow(v) => v.markers(),
        }
    }

    fn charges(&self) -> &[Charge] {
        match self {
            VisualizationKind::Streamlines(v) => v.charges(),
            VisualizationKind::Arrows(v) => v.charges(),
            VisualizationKind::Flow(v) => v.charges(),
        }
    }

    fn params(&self) -> Value {
        match self {
            VisualizationKind::Streamlines(v) => v.params(),
            VisualizationKind::Arrows(v) => v.params(),
            VisualizationKind::Flow(v) => v.params(),
        }
    }

    fn param_schema(&self) -> Value {
        match self {
            VisualizationKind::Streamlines(v) => v.param_schema(),
            VisualizationKind::Arrows(v) => v.param_schema(),
            VisualizationKind::Flow(v) => v.param_schema(),
        }
    }
}
