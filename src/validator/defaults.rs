//! Default injection ahead of schema validation.
//!
//! Every property schema carrying a `default` fills in the instance's missing
//! key, so `required` checks see the defaulted data and handlers receive it.

use serde_json::Value;

/// Insert declared defaults into `instance`, recursively.
///
/// Descends through `properties`, `additionalProperties`, `items` and the
/// `anyOf` / `allOf` / `oneOf` branches of `schema`. Non-object instances are
/// left alone by `properties`; existing keys are never overwritten.
pub fn inject_defaults(schema: &Value, instance: &mut Value) {
    let Some(schema) = schema.as_object() else { return };

    if let Some(object) = instance.as_object_mut() {
        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            for (name, sub_schema) in properties {
                if let Some(default) = sub_schema.get("default") {
                    if !object.contains_key(name) {
                        object.insert(name.clone(), default.clone());
                    }
                }
                if let Some(child) = object.get_mut(name) {
                    inject_defaults(sub_schema, child);
                }
            }
        }
        if let Some(extra) = schema.get("additionalProperties").filter(|s| s.is_object()) {
            for (name, child) in object.iter_mut() {
                if !properties.is_some_and(|p| p.contains_key(name)) {
                    inject_defaults(extra, child);
                }
            }
        }
    }

    if let (Some(items), Some(array)) = (schema.get("items"), instance.as_array_mut()) {
        match items {
            Value::Array(tuple) => {
                for (item_schema, child) in tuple.iter().zip(array.iter_mut()) {
                    inject_defaults(item_schema, child);
                }
            }
            item_schema => {
                for child in array.iter_mut() {
                    inject_defaults(item_schema, child);
                }
            }
        }
    }

    for keyword in ["allOf", "anyOf", "oneOf"] {
        if let Some(branches) = schema.get(keyword).and_then(Value::as_array) {
            for branch in branches {
                inject_defaults(branch, instance);
            }
        }
    }
}
