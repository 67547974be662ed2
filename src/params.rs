use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Outbound request parameters, in insertion order.
pub type Params = Map<String, Value>;

/// Keys that only steer URL construction (or are artefacts of loosely typed
/// callers) and are never sent to the API.
const BASE_EXCLUDES: [&str; 6] = ["self", "kwargs", "api_version", "action", "id", "endpoint"];

/// Returns the base exclusion set extended with `extra`.
pub fn excluded_keys(extra: &[&str]) -> BTreeSet<String> {
    BASE_EXCLUDES
        .iter()
        .chain(extra.iter())
        .map(|k| k.to_string())
        .collect()
}

/// Builds request parameters from `input`, dropping null values and excluded
/// keys. Every key in `required` must be present and non-null.
pub fn params_from_map(input: &Params, exclude: &[&str], required: &[&str]) -> Result<Params> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| input.get(*k).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(Error::validation(compulsory_message(&missing)));
    }

    let excluded = excluded_keys(exclude);
    Ok(input
        .iter()
        .filter(|(k, v)| !v.is_null() && !excluded.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect())
}

fn compulsory_message(missing: &[&str]) -> String {
    if missing.len() > 1 {
        format!("{} are compulsory fields", missing.join(", "))
    } else {
        format!("{} is a compulsory field", missing.join(", "))
    }
}

/// Typed parameter structs that can be flattened into [`Params`].
///
/// Implemented for every `Serialize` type; `Option` fields that are `None`
/// serialize as null and are therefore dropped (or reported, if required).
pub trait RequestParams {
    fn to_request_map(&self, exclude: &[&str], required: &[&str]) -> Result<Params>;
}

impl<T: Serialize + ?Sized> RequestParams for T {
    fn to_request_map(&self, exclude: &[&str], required: &[&str]) -> Result<Params> {
        match serde_json::to_value(self)? {
            Value::Object(map) => params_from_map(&map, exclude, required),
            Value::Null => params_from_map(&Params::new(), exclude, required),
            other => Err(Error::validation(format!(
                "request parameters must be a mapping, got {}",
                other
            ))),
        }
    }
}

/// Legacy (v1) boolean coercion.
///
/// The v1 API accepts `"False"` but not `false`, and wants a real `true`.
/// The asymmetry is the upstream API's, not a mistake here.
pub fn fix_legacy_params(params: Params) -> Params {
    params
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Bool(false) => Value::String("False".to_string()),
                Value::String(s) if s.eq_ignore_ascii_case("false") => {
                    Value::String("False".to_string())
                }
                Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
                other => other,
            };
            (k, v)
        })
        .collect()
}

/// Adds the session token, if any, after normalization.
pub(crate) fn with_token(mut params: Params, token: Option<&str>) -> Params {
    if let Some(token) = token {
        params.insert("token".to_string(), Value::String(token.to_string()));
    }
    params
}
