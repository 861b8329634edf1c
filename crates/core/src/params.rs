//! Typed parameter extraction from a `serde_json::Value` object.
//!
//! Each helper takes a JSON value, a key name, and a default. A missing key or
//! a value of the wrong type yields the default, so a partially specified
//! params object always produces a usable configuration. Range checks happen
//! afterwards, in each config's `validate`.

use glam::DVec3;
use serde_json::Value;

/// Extracts an `f64` from `params[name]`, returning `default` if missing or wrong type.
///
/// Integers are accepted and converted.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Extracts a `usize` from `params[name]`, returning `default` if missing or wrong type.
///
/// Only non-negative JSON integers qualify; `2.5` or `-1` fall back to the default.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Extracts a `String` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}

/// Extracts a 3-vector written as `[x, y, z]` from `params[name]`.
///
/// Anything other than an array of exactly three numbers yields `default`.
pub fn param_vec3(params: &Value, name: &str, default: DVec3) -> DVec3 {
    let Some(items) = params.get(name).and_then(Value::as_array) else {
        return default;
    };
    match items.as_slice() {
        [x, y, z] => match (x.as_f64(), y.as_f64(), z.as_f64()) {
            (Some(x), Some(y), Some(z)) => DVec3::new(x, y, z),
            _ => default,
        },
        _ => default,
    }
}

/// Copies every entry of the `extra` object into `base`.
///
/// Used to combine a visualization's own schema or params with shared ones
/// such as the tracing keys. Non-object inputs leave `base` unchanged.
pub fn merge_objects(mut base: Value, extra: Value) -> Value {
    if let (Value::Object(base_map), Value::Object(extra_map)) = (&mut base, extra) {
        base_map.extend(extra_map);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- param_f64 --

    #[test]
    fn param_f64_extracts_existing_float() {
        let params = json!({"step_size": 0.25});
        assert!((param_f64(&params, "step_size", 1.0) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_extracts_integer_as_float() {
        let params = json!({"bounds_radius": 30});
        assert!((param_f64(&params, "bounds_radius", 0.0) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_when_key_missing() {
        let params = json!({"other": 1.0});
        assert!((param_f64(&params, "k", 100.0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_when_wrong_type() {
        let params = json!({"k": "strong"});
        assert!((param_f64(&params, "k", 1.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_for_non_object() {
        let params = json!([1, 2, 3]);
        assert!((param_f64(&params, "k", 7.0) - 7.0).abs() < f64::EPSILON);
    }

    // -- param_usize --

    #[test]
    fn param_usize_extracts_existing_integer() {
        let params = json!({"line_count": 80});
        assert_eq!(param_usize(&params, "line_count", 0), 80);
    }

    #[test]
    fn param_usize_returns_default_for_float_value() {
        let params = json!({"line_count": 2.5});
        assert_eq!(param_usize(&params, "line_count", 99), 99);
    }

    #[test]
    fn param_usize_returns_default_for_negative_integer() {
        let params = json!({"max_steps": -1});
        assert_eq!(param_usize(&params, "max_steps", 500), 500);
    }

    // -- param_string --

    #[test]
    fn param_string_extracts_existing_string() {
        let params = json!({"palette": "viridis"});
        assert_eq!(param_string(&params, "palette", "white"), "viridis");
    }

    #[test]
    fn param_string_returns_default_for_wrong_type() {
        let params = json!({"palette": 3});
        assert_eq!(param_string(&params, "palette", "white"), "white");
    }

    // -- param_vec3 --

    #[test]
    fn param_vec3_extracts_three_numbers() {
        let params = json!({"axis": [0, 1.5, -2]});
        assert_eq!(
            param_vec3(&params, "axis", DVec3::X),
            DVec3::new(0.0, 1.5, -2.0)
        );
    }

    #[test]
    fn param_vec3_returns_default_for_wrong_length() {
        let params = json!({"axis": [0, 1]});
        assert_eq!(param_vec3(&params, "axis", DVec3::X), DVec3::X);
    }

    #[test]
    fn param_vec3_returns_default_for_non_numeric_entry() {
        let params = json!({"axis": [0, "up", 1]});
        assert_eq!(param_vec3(&params, "axis", DVec3::Z), DVec3::Z);
    }

    #[test]
    fn param_vec3_returns_default_when_missing() {
        assert_eq!(param_vec3(&json!({}), "axis", DVec3::Y), DVec3::Y);
    }

    // -- merge_objects --

    #[test]
    fn merge_objects_combines_keys_and_extra_wins() {
        let merged = merge_objects(json!({"a": 1, "b": 2}), json!({"b": 3, "c": 4}));
        assert_eq!(merged, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn merge_objects_ignores_non_object_extra() {
        assert_eq!(merge_objects(json!({"a": 1}), json!([1])), json!({"a": 1}));
    }
}
