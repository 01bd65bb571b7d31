//! Error resolver: which detected errors should be visible, and which spans should go.

use std::collections::HashSet;

use crate::suppression::SuppressionStore;
use crate::types::{DetectedError, HighlightedSpan};

/// Diff between the active error set and the registered spans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Detected, unsuppressed errors with no span yet, in detection order.
    pub to_activate: Vec<DetectedError>,
    /// Registered spans whose token is no longer reported or is now suppressed.
    pub to_deactivate: Vec<HighlightedSpan>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.to_activate.is_empty() && self.to_deactivate.is_empty()
    }
}

/// Compute the activation diff.
///
/// Pure and deterministic. Errors repeating an earlier `original` collapse into
/// the first one, so one token never yields two spans.
pub fn resolve<'a>(
    detected: &[DetectedError],
    registered: impl IntoIterator<Item = &'a HighlightedSpan>,
    suppression: &SuppressionStore,
) -> Resolution {
    let reported: HashSet<&str> = detected.iter().map(|e| e.original.as_str()).collect();

    let mut highlighted = HashSet::new();
    let mut to_deactivate = Vec::new();
    for span in registered {
        highlighted.insert(span.text.clone());
        if !reported.contains(span.text.as_str()) || suppression.is_suppressed(&span.text) {
            to_deactivate.push(span.clone());
        }
    }

    let mut seen = HashSet::new();
    let to_activate = detected
        .iter()
        .filter(|e| !suppression.is_suppressed(&e.original))
        .filter(|e| !highlighted.contains(&e.original))
        .filter(|e| seen.insert(e.original.clone()))
        .cloned()
        .collect();

    Resolution {
        to_activate,
        to_deactivate,
    }
}
