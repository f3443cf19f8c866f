//! Deterministic JSON encoding for signing.
//!
//! Structurally equal values always produce byte-equal output: object keys
//! are emitted in code-point order, arrays keep their order, and there is no
//! insignificant whitespace. The output is itself valid JSON, so
//! `canonicalize(parse(canonicalize(v))) == canonicalize(v)`.

use serde::Serialize;
use serde_json::Value;

use crate::{Result, WeftError};

/// Canonicalize any serializable value into stable UTF-8 bytes.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(canonical_string(&value)?.into_bytes())
}

/// Canonicalize a JSON value into its deterministic string form.
pub fn canonical_string(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(WeftError::Protocol(
                        "non-finite number cannot be canonicalized".into(),
                    ));
                }
            }
            out.push_str(&n.to_string());
        }
        Value::String(s) => out.push_str(&serde_json::to_string(s)?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_value(val, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}
