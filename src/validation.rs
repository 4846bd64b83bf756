//! Input validation for analysis requests
//!
//! The HTTP shell runs these checks before handing a request to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher). Options are persisted as JSONB
//! with queued jobs, so their size and shape are bounded here as well.

use serde_json::Value;
use thiserror::Error;

use crate::types::{AnalysisOptions, AnalysisRequest};

/// Default maximum text length in characters when neither the caller nor configuration says otherwise
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 100_000;

/// Maximum allowed size for serialized options (64KB)
const MAX_OPTIONS_SIZE_BYTES: usize = 64 * 1024;

/// Maximum nesting depth for option objects/arrays
const MAX_OPTIONS_DEPTH: usize = 8;

/// Maximum number of keys in an options object or items in an array
const MAX_OPTIONS_KEYS: usize = 256;

/// Request validation failures (rejected before reaching the orchestrator)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Text cannot be empty")]
    EmptyText,

    #[error("Text exceeds maximum length of {max_length} characters (got {length})")]
    TextTooLong { length: usize, max_length: usize },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl ValidationError {
    /// HTTP status the shell should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TextTooLong { .. } => 413,
            Self::EmptyText | Self::InvalidOptions(_) => 400,
        }
    }
}

/// Validate raw shell input and build a request from it.
///
/// The effective limit is the caller's `options.max_length` when present,
/// otherwise `default_max_length`.
pub fn validate_request(
    text: &str,
    options: AnalysisOptions,
    default_max_length: usize,
) -> Result<AnalysisRequest, ValidationError> {
    validate_options(&options)?;

    let request = AnalysisRequest::new(text, options)?;
    let max_length = request.max_length().unwrap_or(default_max_length);
    let length = request.char_len();

    if length > max_length {
        return Err(ValidationError::TextTooLong { length, max_length });
    }

    Ok(request)
}

/// Validates option payloads for size and structure constraints
pub fn validate_options(options: &AnalysisOptions) -> Result<(), ValidationError> {
    let serialized = serde_json::to_string(options)
        .map_err(|e| ValidationError::InvalidOptions(format!("Invalid JSON structure: {e}")))?;

    if serialized.len() > MAX_OPTIONS_SIZE_BYTES {
        return Err(ValidationError::InvalidOptions(format!(
            "options payload too large: {} bytes (max: {MAX_OPTIONS_SIZE_BYTES})",
            serialized.len()
        )));
    }

    if let Some(max_length) = options.get("max_length") {
        if !max_length.is_u64() {
            return Err(ValidationError::InvalidOptions(
                "max_length must be a non-negative integer".to_string(),
            ));
        }
    }

    if options.len() > MAX_OPTIONS_KEYS {
        return Err(ValidationError::InvalidOptions(format!(
            "too many option keys: {} (max: {MAX_OPTIONS_KEYS})",
            options.len()
        )));
    }

    for value in options.values() {
        validate_json_depth(value, 1)?;
    }

    Ok(())
}

fn validate_json_depth(value: &Value, current_depth: usize) -> Result<(), ValidationError> {
    if current_depth > MAX_OPTIONS_DEPTH {
        return Err(ValidationError::InvalidOptions(format!(
            "options nesting too deep: {current_depth} (max: {MAX_OPTIONS_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => {
            if map.len() > MAX_OPTIONS_KEYS {
                return Err(ValidationError::InvalidOptions(format!(
                    "too many option keys: {} (max: {MAX_OPTIONS_KEYS})",
                    map.len()
                )));
            }
            for val in map.values() {
                validate_json_depth(val, current_depth + 1)?;
            }
        }
        Value::Array(arr) => {
            if arr.len() > MAX_OPTIONS_KEYS {
                return Err(ValidationError::InvalidOptions(format!(
                    "option array too large: {} items (max: {MAX_OPTIONS_KEYS})",
                    arr.len()
                )));
            }
            for item in arr {
                validate_json_depth(item, current_depth + 1)?;
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> AnalysisOptions {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_request() {
        let request = validate_request(
            "The cat sat on the mat.",
            options(json!({"include_morphology": true})),
            DEFAULT_MAX_TEXT_LENGTH,
        )
        .unwrap();
        assert_eq!(request.text(), "The cat sat on the mat.");
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = validate_request("", AnalysisOptions::new(), DEFAULT_MAX_TEXT_LENGTH)
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyText);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_caller_max_length_wins() {
        let err = validate_request("abcdef", options(json!({"max_length": 5})), 1000).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TextTooLong {
                length: 6,
                max_length: 5
            }
        );
        assert_eq!(err.status_code(), 413);
    }

    #[test]
    fn test_default_max_length_applies() {
        let text = "x".repeat(11);
        assert!(matches!(
            validate_request(&text, AnalysisOptions::new(), 10),
            Err(ValidationError::TextTooLong { .. })
        ));
        assert!(validate_request(&text, AnalysisOptions::new(), 11).is_ok());
    }

    #[test]
    fn test_non_numeric_max_length_rejected() {
        assert!(matches!(
            validate_options(&options(json!({"max_length": "ten"}))),
            Err(ValidationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_options_too_deep() {
        let mut deep = json!({});
        for _ in 0..12 {
            deep = json!({ "inner": deep });
        }
        assert!(validate_options(&options(json!({ "nested": deep }))).is_err());
    }
}
