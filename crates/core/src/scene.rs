//! Reproducible description of a visualization.
//!
//! A [`Scene`] captures everything needed to rebuild a visualization
//! exactly: which visualization, the charges, the Coulomb scale constant,
//! parameter overrides, the PRNG seed and how many frames to advance.

use crate::charge::{dipole, validate_charges, Charge};
use crate::error::FieldError;
use crate::evaluator::{validate_k, DEFAULT_COULOMB_K};
use serde::{Deserialize, Serialize};

/// Two identical `Scene` values produce bit-identical markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub visualization: String,
    pub charges: Vec<Charge>,
    #[serde(default = "default_k")]
    pub k: f64,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub steps: usize,
}

fn default_k() -> f64 {
    DEFAULT_COULOMB_K
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Scene {
    /// The default dipole scene for `visualization`, with empty params and zero steps.
    pub fn new(visualization: &str, seed: u64) -> Self {
        Self {
            visualization: visualization.to_string(),
            charges: dipole(),
            k: DEFAULT_COULOMB_K,
            params: empty_params(),
            seed,
            steps: 0,
        }
    }

    /// Parses a scene from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, FieldError> {
        let scene: Scene =
            serde_json::from_str(json).map_err(|e| FieldError::InvalidScene(e.to_string()))?;
        scene.validate()?;
        Ok(scene)
    }

    /// Checks the charges, the scale constant and that params is an object.
    pub fn validate(&self) -> Result<(), FieldError> {
        validate_charges(&self.charges)?;
        validate_k(self.k)?;
        if !self.params.is_object() {
            return Err(FieldError::ParamTypeMismatch {
                name: "params".to_string(),
                expected: "object".to_string(),
                got: json_type_name(&self.params).to_string(),
            });
        }
        Ok(())
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn new_uses_dipole_and_defaults() {
        let s = Scene::new("streamlines", 42);
        assert_eq!(s.visualization, "streamlines");
        assert_eq!(s.charges, dipole());
        assert!((s.k - DEFAULT_COULOMB_K).abs() < f64::EPSILON);
        assert_eq!(s.params, serde_json::json!({}));
        assert_eq!(s.seed, 42);
        assert_eq!(s.steps, 0);
    }

    #[test]
    fn json_round_trip_with_custom_params() {
        let mut s = Scene::new("flow", 7);
        s.params = serde_json::json!({"particle_count": 500, "step_size": 0.3});
        s.steps = 120;
        s.charges.push(Charge::new(DVec3::new(0.0, 6.0, 0.0), 0.5));
        let json = serde_json::to_string_pretty(&s).unwrap();
        assert_eq!(Scene::from_json_str(&json).unwrap(), s);
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let json = r#"{
            "visualization": "arrows",
            "charges": [{"position": [0.0, 0.0, 0.0], "magnitude": 1.0}]
        }"#;
        let s = Scene::from_json_str(json).unwrap();
        assert!((s.k - DEFAULT_COULOMB_K).abs() < f64::EPSILON);
        assert_eq!(s.seed, 0);
        assert_eq!(s.steps, 0);
        assert!(s.params.is_object());
    }

    #[test]
    fn malformed_json_is_invalid_scene() {
        assert!(matches!(
            Scene::from_json_str("{not json"),
            Err(FieldError::InvalidScene(_))
        ));
    }

    #[test]
    fn empty_charge_list_fails_validation() {
        let json = r#"{"visualization": "arrows", "charges": []}"#;
        assert!(matches!(
            Scene::from_json_str(json),
            Err(FieldError::InvalidCharges(_))
        ));
    }

    #[test]
    fn non_object_params_fail_validation() {
        let mut s = Scene::new("arrows", 1);
        s.params = serde_json::json!([1, 2]);
        assert!(matches!(
            s.validate(),
            Err(FieldError::ParamTypeMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_k_fails_validation() {
        let mut s = Scene::new("arrows", 1);
        s.k = f64::INFINITY;
        assert!(s.validate().is_err());
    }
}
