//! Firebase Realtime Database payload types
//!
//! The REST API returns the raw JSON stored at a path. A catalog written as
//! a list comes back as an array (possibly with `null` holes where indexes
//! were deleted) or, once keys stop being dense, as an object keyed by index.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FirebaseError, Result};

/// Error body returned with non-2xx statuses
///
/// See: https://firebase.google.com/docs/reference/rest/database#section-error-conditions
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseErrorBody {
    pub error: String,
}

impl FirebaseErrorBody {
    /// Best-effort message from an error response body
    pub fn message_from(body: &[u8]) -> String {
        serde_json::from_slice::<FirebaseErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string())
    }
}

/// Raw catalog entries from a records payload.
///
/// `excluded_key` names a top-level child that is not a record (the subtree
/// holding the version stamp when records live at the database root).
pub fn catalog_entries(payload: Value, excluded_key: Option<&str>) -> Result<Vec<Value>> {
    match payload {
        Value::Array(entries) => Ok(entries),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(key, _)| Some(key.as_str()) != excluded_key)
            .map(|(_, value)| value)
            .collect()),
        Value::Null => Err(FirebaseError::InvalidPayload(
            "no catalog stored at records path".to_string(),
        )),
        other => Err(FirebaseError::InvalidPayload(format!(
            "expected an array or object of records, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
