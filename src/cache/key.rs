//! Deterministic cache keys for request descriptors

use crate::error::{FightgraphError, Result};
use serde::Serialize;
use serde_json::Value;

/// Derive a stable cache key from a request descriptor.
///
/// The descriptor is serialized to JSON and rewritten into a canonical form:
/// object fields sorted by name and `null` fields dropped. Values are kept
/// verbatim, since identifiers are case-sensitive, and arrays keep their
/// order. The canonical text is hashed with BLAKE3, so descriptors that
/// differ only in field order share a key.
pub fn generate_key<T: Serialize + ?Sized>(descriptor: &T) -> Result<String> {
    let value = serde_json::to_value(descriptor).map_err(|e| FightgraphError::Json {
        source: e,
        context: "Failed to serialize cache descriptor".to_string(),
    })?;

    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);

    let hash = blake3::hash(canonical.as_bytes());
    Ok(hash.to_hex()[..32].to_string())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_order_does_not_matter() {
        let a = json!({"id": "jon-jones", "page": 2, "kind": "profile"});
        let b = json!({"kind": "profile", "page": 2, "id": "jon-jones"});
        assert_eq!(generate_key(&a).unwrap(), generate_key(&b).unwrap());
    }

    #[test]
    fn test_null_fields_are_dropped() {
        let a = json!({"id": "jon-jones"});
        let b = json!({"id": "jon-jones", "referer": null});
        assert_eq!(generate_key(&a).unwrap(), generate_key(&b).unwrap());
    }

    #[test]
    fn test_string_values_are_verbatim() {
        let upper = json!({"id": "Jon-Jones-27944"});
        let lower = json!({"id": "jon-jones-27944"});
        let padded = json!({"id": " jon-jones-27944"});
        assert_ne!(generate_key(&upper).unwrap(), generate_key(&lower).unwrap());
        assert_ne!(generate_key(&lower).unwrap(), generate_key(&padded).unwrap());
    }

    #[test]
    fn test_nested_objects_are_canonical() {
        let a = json!({"req": {"b": 1, "a": [1, 2]}});
        let b = json!({"req": {"a": [1, 2], "b": 1}});
        assert_eq!(generate_key(&a).unwrap(), generate_key(&b).unwrap());
    }

    #[test]
    fn test_distinct_descriptors_differ() {
        let a = json!({"id": "jon-jones"});
        let b = json!({"id": "stipe-miocic"});
        let c = json!({"id": ["a", "b"]});
        let d = json!({"id": ["b", "a"]});
        assert_ne!(generate_key(&a).unwrap(), generate_key(&b).unwrap());
        assert_ne!(generate_key(&c).unwrap(), generate_key(&d).unwrap());
    }

    #[test]
    fn test_key_shape() {
        let key = generate_key(&json!({"id": "x"})).unwrap();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
