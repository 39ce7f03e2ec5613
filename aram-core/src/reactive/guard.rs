//! Prototype-pollution payload detection.
//!
//! Typed Rust values cannot carry a `__proto__` key, but dynamically shaped
//! JSON flowing through application state can, and may later be handed to a
//! script host. Cells refuse to store such payloads.

use std::any::Any;

use serde_json::{Map, Value};

const FORBIDDEN_KEYS: [&str; 2] = ["__proto__", "prototype"];

fn has_forbidden_key(map: &Map<String, Value>) -> bool {
    FORBIDDEN_KEYS.iter().any(|key| map.contains_key(*key))
}

/// True when `value` is a JSON object carrying an own `__proto__` or
/// `prototype` key. Only the top level is inspected.
pub(crate) fn is_pollution_payload(value: &dyn Any) -> bool {
    if let Some(Value::Object(map)) = value.downcast_ref::<Value>() {
        return has_forbidden_key(map);
    }
    if let Some(map) = value.downcast_ref::<Map<String, Value>>() {
        return has_forbidden_key(map);
    }
    false
}
