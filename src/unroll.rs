//! Nested attribute handling for BES building/block records.
//!
//! v2 records flatten block attributes as `"wall:wall_type"`, each with a
//! `"wall:wall_type_status!"` confidence marker.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Marker value for attributes the user could not supply.
pub const UNKNOWN: &str = "Do not know";

const STATUS_SUFFIX: &str = "_status!";
const FIXTURE_STATUS: &str = "fixture_status!";

/// Splits `key` on a single colon and merges `value` into the nested map
/// already held in `dct` under the outer key.
///
/// Keys without exactly one colon come back unchanged.
pub fn split_key(dct: &Map<String, Value>, key: &str, value: Value) -> Result<(String, Value)> {
    let mut parts = key.split(':');
    let (outer, inner) = match (parts.next(), parts.next(), parts.next()) {
        (Some(outer), Some(inner), None) => (outer, inner),
        _ => return Ok((key.to_string(), value)),
    };

    let mut nested = match dct.get(outer) {
        Some(Value::Object(existing)) => existing.clone(),
        Some(_) => return Err(not_a_mapping(outer)),
        None => Map::new(),
    };
    if nested.contains_key(inner) {
        return Err(duplicate_subkey(inner, outer));
    }
    nested.insert(inner.to_string(), value);
    Ok((outer.to_string(), Value::Object(nested)))
}

fn duplicate_subkey(inner: &str, outer: &str) -> Error {
    Error::validation(format!("Subkey {} already exists in {}", inner, outer))
}

fn not_a_mapping(outer: &str) -> Error {
    Error::validation(format!("{} already holds a value that is not a mapping", outer))
}

/// Adds a plain key to `out`, merging into a mapping built from earlier
/// `"key:subkey"` entries. Never replaces an existing value.
fn insert_plain(out: &mut Map<String, Value>, key: String, value: Value) -> Result<()> {
    if !out.contains_key(&key) {
        out.insert(key, value);
        return Ok(());
    }
    let incoming = match value {
        Value::Object(incoming) => incoming,
        _ => return Err(not_a_mapping(&key)),
    };
    let Some(Value::Object(existing)) = out.get_mut(&key) else {
        return Err(not_a_mapping(&key));
    };
    for (inner, v) in incoming {
        if existing.contains_key(&inner) {
            return Err(duplicate_subkey(&inner, &key));
        }
        existing.insert(inner, v);
    }
    Ok(())
}

/// Converts `{"a:b": v}` into `{"a": {"b": v}}` throughout `value`.
pub fn unroll(value: &Value) -> Result<Value> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                let v = unroll(v)?;
                let (outer, v) = split_key(&out, k, v)?;
                if outer == *k {
                    insert_plain(&mut out, outer, v)?;
                } else {
                    out.insert(outer, v);
                }
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items.iter().map(unroll).collect::<Result<Vec<_>>>().map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Drops attributes marked `"Do not know"`; never mutates `value`.
///
/// Mappings flagged through `fixture_status!` disappear entirely, as do
/// nested mappings that the filter leaves empty.
pub fn remove_unknown(value: &Value) -> Value {
    filter_unknown(value).unwrap_or_else(|| match value {
        Value::Object(_) => Value::Object(Map::new()),
        _ => Value::Null,
    })
}

fn filter_unknown(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => filter_map(map),
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(filter_unknown).collect(),
        )),
        other => Some(other.clone()),
    }
}

fn filter_map(map: &Map<String, Value>) -> Option<Value> {
    if is_unknown(map.get(FIXTURE_STATUS)) {
        return None;
    }

    let mut out = Map::new();
    for (k, v) in map {
        let marker = format!("{}{}", k, STATUS_SUFFIX);
        if is_unknown(map.get(&marker)) || is_unknown(Some(v)) {
            continue;
        }
        if let Some(filtered) = filter_unknown(v) {
            out.insert(k.clone(), filtered);
        }
    }

    if out.is_empty() && !map.is_empty() {
        None
    } else {
        Some(Value::Object(out))
    }
}

fn is_unknown(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::String(s)) if s == UNKNOWN)
}
