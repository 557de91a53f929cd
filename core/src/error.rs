//! Error types for the todo API client.
//!
//! # Design
//! Every failure a caller can see is one `ApiError` variant. The variants
//! follow what the caller does next: fix credentials (`Auth`), fix the
//! identifier (`NotFound`), fix the input (`Validation`), try again later
//! (`Transport`), or report a bug in the server or client
//! (`ResponseParse`, `UnexpectedStatus`, `Serialization`).
//!
//! `Validation` is shared by local pre-flight checks and server 422
//! responses so both render the same way.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A single field-level validation message.
///
/// `field` is empty when the message applies to the request as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Errors returned by `TodoClient` and `TodoApi`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 or 403 from the server.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 404 from the server. Carries the id (or path) that was requested.
    #[error("todo not found: {0}")]
    NotFound(String),

    /// 422 from the server, or a request rejected before it was sent.
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Network failure, timeout or 5xx. Safe for the user to retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body does not match the expected model.
    #[error("could not parse response: {0}")]
    ResponseParse(String),

    /// Any status the client has no mapping for.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Stable tag used in machine-readable error output.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "auth",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::Transport(_) => "transport",
            ApiError::ResponseParse(_) => "response_parse",
            ApiError::UnexpectedStatus { .. } => "unexpected_status",
            ApiError::Serialization(_) => "serialization",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            ApiError::Validation(fields) => fields,
            _ => &[],
        }
    }

    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract field messages from a 422 body.
///
/// Understands FastAPI's `{"detail": [{"loc": [..], "msg": ..}]}`, a
/// `detail` string or object, and a flat `{"field": "message"}` object.
/// Messages are kept verbatim. A body in none of these shapes becomes one
/// field-less message holding the raw text.
pub fn parse_validation_body(body: &str) -> Vec<FieldError> {
    let fields = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::Array(items)) => items.iter().filter_map(detail_entry).collect(),
            Some(Value::String(message)) => vec![FieldError::new("", message.as_str())],
            Some(Value::Object(inner)) => object_entries(inner),
            _ => object_entries(&map),
        },
        _ => Vec::new(),
    };
    if !fields.is_empty() {
        return fields;
    }
    let raw = body.trim();
    let message = if raw.is_empty() {
        "unprocessable entity"
    } else {
        raw
    };
    vec![FieldError::new("", message)]
}

fn detail_entry(item: &Value) -> Option<FieldError> {
    let message = item.get("msg").and_then(Value::as_str)?;
    let field = item
        .get("loc")
        .and_then(Value::as_array)
        .map(|loc| {
            loc.iter()
                .enumerate()
                .filter(|(i, segment)| {
                    !(*i == 0 && matches!(segment.as_str(), Some("body" | "query" | "path")))
                })
                .map(|(_, segment)| match segment {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default();
    Some(FieldError::new(field, message))
}

fn object_entries(map: &serde_json::Map<String, Value>) -> Vec<FieldError> {
    map.iter()
        .filter_map(|(field, value)| {
            let message = match value {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => return None,
            };
            Some(FieldError::new(field.as_str(), message))
        })
        .collect()
}
