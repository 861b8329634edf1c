#![deny(unsafe_code)]
//! WASM bindings for the efield engine.
//!
//! Exposes one [`FieldScene`] per visualization to a browser renderer. The
//! renderer reads markers back as a flat `Float32Array` of
//! [`INSTANCE_STRIDE`] floats each and feeds it to instanced geometry.

use efield_core::charge::{dipole, Charge};
use efield_core::error::FieldError;
use efield_core::evaluator::DEFAULT_COULOMB_K;
use efield_core::grid::PotentialGrid;
use efield_core::palette::Palette;
use efield_core::scene::Scene;
use efield_core::Visualization;
use efield_engines::instance::{
    charge_buffer, charges_from_flat, instance_buffer, potential_buffer, INSTANCE_STRIDE,
};
use efield_engines::VisualizationKind;
use glam::DVec3;
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// Largest potential grid resolution per axis.
pub const MAX_GRID_RESOLUTION: usize = 128;

/// A visualization and the Coulomb constant it was built with.
#[wasm_bindgen]
pub struct FieldScene {
    vis: VisualizationKind,
    k: f64,
}

#[wasm_bindgen]
impl FieldScene {
    /// Builds `name` over `charges_flat` (`[x, y, z, q, ...]`; empty means the
    /// default dipole) with `params_json` overrides and the Coulomb constant 100.
    #[wasm_bindgen(constructor)]
    pub fn new(
        name: &str,
        seed: u64,
        params_json: &str,
        charges_flat: &[f64],
    ) -> Result<FieldScene, JsError> {
        Ok(build(name, seed, params_json, charges_flat)?)
    }

    /// Builds from a serialized scene, applying its `steps`.
    pub fn from_scene(scene_json: &str) -> Result<FieldScene, JsError> {
        let scene = Scene::from_json_str(scene_json)?;
        let vis = VisualizationKind::from_scene(&scene)?;
        Ok(FieldScene { vis, k: scene.k })
    }

    /// Advance one frame.
    pub fn step(&mut self) -> Result<(), JsError> {
        Ok(self.vis.step()?)
    }

    pub fn name(&self) -> String {
        self.vis.name().to_string()
    }

    pub fn marker_count(&self) -> usize {
        self.vis.markers().len()
    }

    pub fn instance_stride(&self) -> usize {
        INSTANCE_STRIDE
    }

    /// Current markers packed as `[px, py, pz, dx, dy, dz, intensity, r, g, b]`.
    pub fn instance_buffer(&self) -> Vec<f32> {
        instance_buffer(self.vis.markers())
    }

    /// Charges packed as `[x, y, z, q]`.
    pub fn charge_buffer(&self) -> Vec<f32> {
        charge_buffer(self.vis.charges())
    }

    /// Potential sampled on a `resolution`³ grid spanning `[-half_extent, half_extent]³`.
    /// `resolution` is capped at [`MAX_GRID_RESOLUTION`].
    pub fn potential_grid(
        &self,
        resolution: usize,
        half_extent: f64,
    ) -> Result<Vec<f32>, JsError> {
        Ok(potential_buffer(&self.sample_potential(resolution, half_extent)?))
    }

    /// Current parameter values as a JSON string.
    pub fn params(&self) -> String {
        self.vis.params().to_string()
    }

    pub fn param_schema(&self) -> String {
        self.vis.param_schema().to_string()
    }
}

impl FieldScene {
    fn sample_potential(
        &self,
        resolution: usize,
        half_extent: f64,
    ) -> Result<PotentialGrid, FieldError> {
        if resolution > MAX_GRID_RESOLUTION {
            return Err(FieldError::invalid_param(
                "resolution",
                format!("must be at most {MAX_GRID_RESOLUTION}"),
            ));
        }
        let extent = DVec3::splat(half_extent.abs());
        PotentialGrid::sample(
            self.vis.charges(),
            self.k,
            -extent,
            extent,
            [resolution; 3],
        )
    }
}

fn build(
    name: &str,
    seed: u64,
    params_json: &str,
    charges_flat: &[f64],
) -> Result<FieldScene, FieldError> {
    let params = parse_params(params_json)?;
    let charges: Vec<Charge> = if charges_flat.is_empty() {
        dipole()
    } else {
        charges_from_flat(charges_flat)?
    };
    let vis = VisualizationKind::from_name(name, charges, DEFAULT_COULOMB_K, seed, &params)?;
    Ok(FieldScene {
        vis,
        k: DEFAULT_COULOMB_K,
    })
}

/// An empty string means no overrides.
fn parse_params(params_json: &str) -> Result<Value, FieldError> {
    if params_json.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let params: Value = serde_json::from_str(params_json)
        .map_err(|e| FieldError::invalid_param("params", e.to_string()))?;
    if !params.is_object() {
        return Err(FieldError::invalid_param("params", "must be a JSON object"));
    }
    Ok(params)
}

/// Names accepted by [`FieldScene::new`], as a JSON array.
#[wasm_bindgen]
pub fn list_visualizations() -> String {
    serde_json::json!(VisualizationKind::list_visualizations()).to_string()
}

/// Built-in palette names, as a JSON array.
#[wasm_bindgen]
pub fn list_palettes() -> String {
    serde_json::json!(Palette::list_names()).to_string()
}
