//! Core data types: detected errors, highlighted spans, and click anchors.
//!
//! These types are framework-agnostic and independent of any editing surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One misspelling reported by the checking service.
///
/// Identity is the exact text of `original` (case-sensitive, as received).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedError {
    /// The token as it appears in the checked text.
    pub original: SmolStr,
    /// Candidate replacements, best first.
    #[serde(default)]
    pub suggestions: Vec<SmolStr>,
}

impl DetectedError {
    pub fn new(
        original: impl Into<SmolStr>,
        suggestions: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) -> Self {
        Self {
            original: original.into(),
            suggestions: suggestions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Registry-scoped span identifier.
///
/// Allocated from a monotonic counter; never reused within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(u64);

impl SpanId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sm-{}", self.0)
    }
}

/// A highlighted token inside the document.
///
/// All occurrences of the same token share one span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightedSpan {
    pub id: SpanId,
    pub text: SmolStr,
    pub suggestions: Vec<SmolStr>,
}

/// Where a click landed, in surface coordinates. The suggestion menu opens here.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
}

impl AnchorPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A language the checking service understands. Each session checks one language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name, e.g. "English".
    pub name: SmolStr,
    /// Key sent to the service as the `lang` field, e.g. "en".
    pub key: SmolStr,
}

impl Language {
    pub fn new(name: impl Into<SmolStr>, key: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn english() -> Self {
        Self::new("English", "en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detected_error_deserializes_service_shape() {
        let json = r#"{"original":"problim","suggestions":["problem","prelim"]}"#;
        let err: DetectedError = serde_json::from_str(json).unwrap();
        assert_eq!(err, DetectedError::new("problim", ["problem", "prelim"]));
    }

    #[test]
    fn test_detected_error_missing_suggestions() {
        let err: DetectedError = serde_json::from_str(r#"{"original":"xyzzy"}"#).unwrap();
        assert!(err.suggestions.is_empty());
    }

    #[test]
    fn test_span_id_display() {
        assert_eq!(SpanId::from_raw(7).to_string(), "sm-7");
    }
}
