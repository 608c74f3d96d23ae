//! JSON merge helpers for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base, recursively overriding objects.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Merge overlay into base, skipping keys locked by the constraints tree.
///
/// A constraint object descends into nested objects; any other constraint
/// value locks the key entirely.
pub(super) fn merge_json_with_constraints(
    base: &mut Value,
    overlay: &Value,
    constraints: Option<&Value>,
) {
    let Some(constraints) = constraints else {
        merge_json_values(base, overlay);
        return;
    };
    let (Value::Object(base_map), Value::Object(overlay_map), Value::Object(constraint_map)) =
        (base, overlay, constraints)
    else {
        // Locked value or shape mismatch: keep the base.
        return;
    };
    for (key, value) in overlay_map {
        match constraint_map.get(key) {
            None => match base_map.get_mut(key) {
                Some(existing) => merge_json_values(existing, value),
                None => {
                    base_map.insert(key.clone(), value.clone());
                }
            },
            Some(nested) if nested.is_object() => {
                let entry = base_map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                merge_json_with_constraints(entry, value, Some(nested));
            }
            Some(_) => {}
        }
    }
}
