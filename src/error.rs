use serde_json::{Map, Value};
use thiserror::Error;

use crate::client::ApiResponse;

/// Errors returned by every client operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input: caller arguments rejected before any
    /// network call, or a building BES reports as invalid.
    #[error("{0}")]
    Validation(String),

    /// Non-success HTTP response from the BES API.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse API JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// HTTP status code for [`Error::Api`] (and transport errors that carry one).
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error payloads seen in the wild: `{"error": ...}` from both generations,
/// `{"errors": {...}}` from validation failures on v2.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct BesErrorResponse {
    #[serde(default)]
    pub(crate) error: Option<Value>,
    #[serde(default)]
    pub(crate) errors: Option<Value>,
}

/// Fails with [`Error::Api`] unless `response` has a 2xx status.
///
/// The message is `"{prefix}: {status} {text}"`, where `text` is pulled from
/// the body if one of the known error encodings is present, otherwise
/// `default`.
pub fn check_call_success(
    response: &ApiResponse,
    prefix: Option<&str>,
    default: Option<&str>,
) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let text = extract_error_text(&response.body).or_else(|| default.map(str::to_string));
    Err(format_api_error(response.status, prefix, text.as_deref()))
}

pub(crate) fn format_api_error(status: u16, prefix: Option<&str>, text: Option<&str>) -> Error {
    let mut message = String::new();
    if let Some(prefix) = prefix {
        message.push_str(prefix);
        message.push_str(": ");
    }
    message.push_str(&format!("{} {}", status, text.unwrap_or("")));
    let message = message.trim_end().to_string();
    Error::Api { status, message }
}

pub(crate) fn extract_error_text(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) => {
            let parsed: BesErrorResponse =
                serde_json::from_value(Value::Object(obj)).unwrap_or_default();
            if let Some(error) = parsed.error.filter(|v| !v.is_null()) {
                return Some(render_value(&error));
            }
            match parsed.errors {
                Some(Value::Object(errors)) => Some(render_error_map(&errors)),
                Some(Value::Array(errors)) => Some(join_values(&errors)),
                Some(Value::Null) | None => None,
                Some(other) => Some(render_value(&other)),
            }
        }
        Ok(_) => None,
        Err(_) => raw_error_text(body),
    }
}

fn raw_error_text(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() || looks_like_html(trimmed) {
        return None;
    }
    // v1 errors come back as a rails stack trace; the first line is the message.
    let first = trimmed.lines().next().unwrap_or(trimmed).trim_end();
    Some(first.to_string())
}

fn looks_like_html(text: &str) -> bool {
    let head: String = text.chars().take(16).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn render_error_map(errors: &Map<String, Value>) -> String {
    errors
        .iter()
        .map(|(k, v)| match v {
            Value::Array(items) => format!("{}: {}", k, join_values(items)),
            other => format!("{}: {}", k, render_value(other)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn join_values(items: &[Value]) -> String {
    items.iter().map(render_value).collect::<Vec<_>>().join(", ")
}

pub(crate) fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
