//! Form encoding of flat JSON objects

use crate::errors::HttpError;
use serde_json::Value as JsonValue;

/// Flatten a JSON object into `application/x-www-form-urlencoded` pairs
///
/// Strings are sent verbatim, numbers and booleans in their JSON spelling,
/// nested arrays and objects as JSON text. Null fields are omitted.
pub fn form_pairs(body: &JsonValue) -> Result<Vec<(String, String)>, HttpError> {
    let object = match body {
        JsonValue::Object(object) => object,
        JsonValue::Null => return Ok(Vec::new()),
        other => {
            return Err(HttpError::InvalidBody(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };

    Ok(object
        .iter()
        .filter_map(|(key, value)| {
            let encoded = match value {
                JsonValue::Null => return None,
                JsonValue::String(s) => s.clone(),
                JsonValue::Bool(b) => b.to_string(),
                JsonValue::Number(n) => n.to_string(),
                nested => nested.to_string(),
            };
            Some((key.clone(), encoded))
        })
        .collect())
}
