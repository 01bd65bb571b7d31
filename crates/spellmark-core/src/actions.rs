//! Resolution actions offered by the suggestion menu.
//!
//! Each action mutates exactly one of {document text, suppression store}.
//! None of them touch the span registry: the next reconciliation pass notices
//! the change and deactivates the span on its own.

use smol_str::SmolStr;

use crate::registry::SpanRegistry;
use crate::suppression::SuppressionStore;
use crate::surface::{EditingSurface, SurfaceError};
use crate::types::{DetectedError, HighlightedSpan};

/// What the user chose in the suggestion menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionAction {
    /// Replace the token with this suggestion.
    AcceptSuggestion(SmolStr),
    /// Stop flagging the token for this session.
    Ignore,
    /// Add the token to the personal dictionary.
    AddToDictionary,
}

/// Result of running a resolution action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The token's highlighted occurrences were replaced in the document.
    Replaced { occurrences: usize },
    /// The token was added to a suppression set.
    Suppressed,
    /// No span was selected, or it vanished before the action ran.
    Stale,
}

impl ResolutionAction {
    /// Run the action against the selected span.
    ///
    /// Accepting replaces every live highlighted occurrence of the token, last
    /// first so earlier ranges stay valid, and drops the token from `detected`.
    pub fn apply<S: EditingSurface + ?Sized>(
        &self,
        span: &HighlightedSpan,
        registry: &SpanRegistry,
        surface: &mut S,
        detected: &mut Vec<DetectedError>,
        suppression: &mut SuppressionStore,
    ) -> Result<ActionOutcome, SurfaceError> {
        match self {
            Self::AcceptSuggestion(replacement) => {
                let mut ranges: Vec<_> = registry
                    .handles(span.id)
                    .iter()
                    .filter_map(|h| surface.annotation_range(*h))
                    .collect();
                ranges.sort_by_key(|r| std::cmp::Reverse(r.start));

                surface.begin_batch();
                let replaced = ranges
                    .iter()
                    .try_for_each(|range| surface.replace_range(range.clone(), replacement));
                surface.end_batch();
                replaced?;

                detected.retain(|e| e.original != span.text);
                tracing::debug!(token = %span.text, %replacement, occurrences = ranges.len(), "accepted suggestion");
                Ok(ActionOutcome::Replaced {
                    occurrences: ranges.len(),
                })
            }
            Self::Ignore => {
                suppression.ignore(span.text.clone());
                tracing::debug!(token = %span.text, "ignored");
                Ok(ActionOutcome::Suppressed)
            }
            Self::AddToDictionary => {
                suppression.add_to_dictionary(span.text.clone());
                tracing::debug!(token = %span.text, "added to dictionary");
                Ok(ActionOutcome::Suppressed)
            }
        }
    }
}
