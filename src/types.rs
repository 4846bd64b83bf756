//! # Core Value Types
//!
//! Request, result and cache-key types shared by the cache, engine client,
//! job queue and dispatcher.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::validation::ValidationError;

/// Namespace prefix for every analysis cache key
pub const CACHE_KEY_NAMESPACE: &str = "analysis";

/// Engine options forwarded verbatim with each analysis call.
///
/// Only `max_length` is interpreted by this crate (by the validation helpers);
/// every other flag is engine-specific and passed through untouched.
pub type AnalysisOptions = serde_json::Map<String, serde_json::Value>;

/// A unit of analysis work: the text plus engine options.
///
/// Construction through [`AnalysisRequest::new`] guarantees the text is non-empty.
/// Fields are private so a submitted request cannot be mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnalysisRequest")]
pub struct AnalysisRequest {
    text: String,
    options: AnalysisOptions,
}

#[derive(Deserialize)]
struct RawAnalysisRequest {
    text: String,
    #[serde(default)]
    options: AnalysisOptions,
}

impl TryFrom<RawAnalysisRequest> for AnalysisRequest {
    type Error = ValidationError;

    fn try_from(raw: RawAnalysisRequest) -> Result<Self, Self::Error> {
        Self::new(raw.text, raw.options)
    }
}

impl AnalysisRequest {
    /// Build a request, rejecting empty text
    pub fn new(text: impl Into<String>, options: AnalysisOptions) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Self { text, options })
    }

    /// Build a request with no engine options
    pub fn from_text(text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(text, AnalysisOptions::new())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Length of the text in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Caller-supplied `max_length` option, if present and numeric
    pub fn max_length(&self) -> Option<usize> {
        self.options
            .get("max_length")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
    }

    /// Cache key for this request's text
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_text(&self.text)
    }
}

/// Opaque analysis payload returned by the engine.
///
/// The orchestration layer stores, forwards and caches it but never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(serde_json::Value);

impl AnalysisResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for AnalysisResult {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Deterministic content fingerprint: `"analysis:" + hex(sha256(text))`.
///
/// Options are deliberately not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        Self(format!("{CACHE_KEY_NAMESPACE}:{}", hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_known_digest() {
        // sha256("abc")
        let key = CacheKey::for_text("abc");
        assert_eq!(
            key.as_str(),
            "analysis:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_cache_key_ignores_options() {
        let mut options = AnalysisOptions::new();
        options.insert("include_entities".to_string(), json!(true));

        let plain = AnalysisRequest::from_text("The cat sat on the mat.").unwrap();
        let with_options = AnalysisRequest::new("The cat sat on the mat.", options).unwrap();

        assert_eq!(plain.cache_key(), with_options.cache_key());
    }

    #[test]
    fn test_request_rejects_empty_text() {
        assert_eq!(
            AnalysisRequest::from_text("").unwrap_err(),
            ValidationError::EmptyText
        );
    }

    #[test]
    fn test_deserialize_enforces_non_empty_text() {
        let ok: AnalysisRequest =
            serde_json::from_value(json!({"text": "hello", "options": {"max_length": 10}}))
                .unwrap();
        assert_eq!(ok.text(), "hello");
        assert_eq!(ok.max_length(), Some(10));

        let missing_options: AnalysisRequest =
            serde_json::from_value(json!({"text": "hello"})).unwrap();
        assert!(missing_options.options().is_empty());

        assert!(serde_json::from_value::<AnalysisRequest>(json!({"text": ""})).is_err());
    }

    #[test]
    fn test_char_len_counts_characters() {
        let request = AnalysisRequest::from_text("héllo").unwrap();
        assert_eq!(request.char_len(), 5);
        assert_eq!(request.text().len(), 6);
    }

    #[test]
    fn test_max_length_option() {
        let mut options = AnalysisOptions::new();
        options.insert("max_length".to_string(), json!(500));
        let request = AnalysisRequest::new("text", options).unwrap();
        assert_eq!(request.max_length(), Some(500));

        let mut options = AnalysisOptions::new();
        options.insert("max_length".to_string(), json!("lots"));
        let request = AnalysisRequest::new("text", options).unwrap();
        assert_eq!(request.max_length(), None);
    }

    #[test]
    fn test_result_serializes_transparently() {
        let result = AnalysisResult::new(json!({"tokens": [{"text": "cat"}]}));
        let encoded = serde_json::to_string(&result).unwrap();
        assert_eq!(encoded, r#"{"tokens":[{"text":"cat"}]}"#);
    }
}
