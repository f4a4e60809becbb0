//! Canonical JSON encoding for signed payloads.
//!
//! Every signature and digest in the system is computed over the canonical
//! encoding produced here, so two nodes must agree on it byte for byte.
//! The format is compact JSON with object keys sorted lexicographically by
//! Unicode code point at **every** nesting level:
//!
//! - separators are `,` and `:` with no whitespace,
//! - strings are escaped exactly as `serde_json` escapes them,
//! - integers are decimal with no leading zeros,
//! - absent optional fields serialize as `null`,
//! - arrays keep their order.
//!
//! The sort is applied recursively rather than only at the top level;
//! a top-level-only sort would make signatures over nested objects depend
//! on producer field order.

use serde::Serialize;
use serde_json::Value;

use crate::error::LitefabError;

/// Encodes any serializable value into its canonical JSON form.
///
/// `canonical(x) == canonical(y)` holds exactly when `x` and `y` are
/// value-equal, which is the interop invariant signatures rely on.
pub fn to_canonical<T: Serialize>(value: &T) -> Result<String, LitefabError> {
    let v = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&v, &mut out)?;
    Ok(out)
}

/// Canonical form of an already-materialized [`Value`].
pub fn value_to_canonical(value: &Value) -> Result<String, LitefabError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(v: &Value, out: &mut String) -> Result<(), LitefabError> {
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out)?,
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
            // serde_json's Map is BTreeMap-backed, so iteration is already
            // in lexicographic key order; sort explicitly anyway so the
            // canonical form does not depend on a feature flag.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_value(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Writes a JSON string literal, delegating escaping to `serde_json` so the
/// canonical form stays byte-compatible with its escaping rules.
fn write_string(s: &str, out: &mut String) -> Result<(), LitefabError> {
    let escaped =
        serde_json::to_string(s).map_err(|e| LitefabError::Encoding(e.to_string()))?;
    out.push_str(&escaped);
    Ok(())
}
