//! Canonical JSON encoding.
//!
//! Object keys are emitted in sorted (byte) order at every depth, with no
//! insignificant whitespace. Arrays keep their order. Scalars use
//! `serde_json`'s own formatting, so numbers and string escapes match what
//! `serde_json::to_string` would produce.

use serde_json::Value;

/// Encode a JSON value canonically.
///
/// # Example
/// ```
/// use paygate_crypto::canonical_json;
/// use serde_json::json;
///
/// let v = json!({"z": [3, {"b": true, "a": null}], "a": "x"});
/// assert_eq!(canonical_json(&v), r#"{"a":"x","z":[3,{"a":null,"b":true}]}"#);
/// ```
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        // Null, Bool and Number have a single rendering
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push_str(&Value::String(s.to_owned()).to_string());
}
