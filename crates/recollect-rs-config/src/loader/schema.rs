//! Schema validation helpers for Recollect JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a config value (a single layer or the merged result).
pub(super) fn validate_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "memory"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    Ok(())
}

/// Validate the "memory" block.
fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "max_history",
        "recall_k",
        "timeout_ms",
        "min_score",
        "backend",
        "similarity",
        "capture",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    for key in ["max_history", "recall_k"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("timeout_ms")
        && !value.is_null()
    {
        expect_u64(value, layer, &join_path(path, "timeout_ms"))?;
    }
    if let Some(value) = map.get("min_score")
        && !value.is_null()
    {
        expect_f64(value, layer, &join_path(path, "min_score"))?;
    }
    if let Some(value) = map.get("backend") {
        validate_backend(value, layer, &join_path(path, "backend"))?;
    }
    if let Some(value) = map.get("similarity") {
        validate_similarity(value, layer, &join_path(path, "similarity"))?;
    }
    if let Some(value) = map.get("capture") {
        validate_capture(value, layer, &join_path(path, "capture"))?;
    }
    Ok(())
}

/// Validate the "memory.backend" block.
fn validate_backend(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["kind", "path"], layer, path)?;
    if let Some(value) = map.get("kind") {
        expect_one_of(value, &["memory", "file"], layer, &join_path(path, "kind"))?;
    }
    if let Some(value) = map.get("path")
        && !value.is_null()
    {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    Ok(())
}

/// Validate the "memory.similarity" block.
fn validate_similarity(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["kind"], layer, path)?;
    if let Some(value) = map.get("kind") {
        expect_one_of(value, &["lexical"], layer, &join_path(path, "kind"))?;
    }
    Ok(())
}

/// Validate the "memory.capture" block.
fn validate_capture(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "redact_patterns",
        "detect_secrets",
        "secret_entropy_threshold",
        "max_content_chars",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    if let Some(value) = map.get("redact_patterns") {
        validate_string_array(value, layer, &join_path(path, "redact_patterns"))?;
    }
    if let Some(value) = map.get("detect_secrets") {
        expect_bool(value, layer, &join_path(path, "detect_secrets"))?;
    }
    if let Some(value) = map.get("secret_entropy_threshold") {
        expect_f64(value, layer, &join_path(path, "secret_entropy_threshold"))?;
    }
    if let Some(value) = map.get("max_content_chars")
        && !value.is_null()
    {
        expect_u64(value, layer, &join_path(path, "max_content_chars"))?;
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect one of a fixed set of strings.
fn expect_one_of(
    value: &Value,
    options: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let Some(found) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if options.contains(&found) {
        Ok(())
    } else {
        Err(invalid_field(
            layer,
            path,
            &format!("expected one of: {}", options.join(", ")),
        ))
    }
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative JSON integer.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Validate that a value is an array of strings.
fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(arr) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    for (idx, entry) in arr.iter().enumerate() {
        if !entry.is_string() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join a dotted config path.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build an `InvalidField` error labelled with the layer it came from.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "<root>" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
