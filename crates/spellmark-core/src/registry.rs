//! Span registry: the source of truth for what is currently highlighted.

use smol_str::SmolStr;

use crate::surface::AnnotationHandle;
use crate::types::{HighlightedSpan, SpanId};

/// A registered span plus the surface handles of its highlighted occurrences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanEntry {
    pub span: HighlightedSpan,
    pub handles: Vec<AnnotationHandle>,
}

/// Registered spans, in registration order.
///
/// Ids come from a monotonic counter scoped to the registry, so no id is
/// handed out twice for the registry's lifetime. Only the reconciler
/// registers and unregisters; everyone else reads.
#[derive(Clone, Debug, Default)]
pub struct SpanRegistry {
    entries: Vec<SpanEntry>,
    next_id: u64,
}

impl SpanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and register a span for `text`.
    pub fn register(&mut self, text: SmolStr, suggestions: Vec<SmolStr>) -> &HighlightedSpan {
        let id = SpanId::from_raw(self.next_id);
        self.next_id += 1;
        self.entries.push(SpanEntry {
            span: HighlightedSpan {
                id,
                text,
                suggestions,
            },
            handles: Vec::new(),
        });
        &self.entries[self.entries.len() - 1].span
    }

    /// Remove a span, returning it with its handles. No-op if absent.
    pub fn unregister(&mut self, id: SpanId) -> Option<SpanEntry> {
        let index = self.entries.iter().position(|e| e.span.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, id: SpanId) -> Option<&HighlightedSpan> {
        self.entry(id).map(|e| &e.span)
    }

    pub fn contains(&self, id: SpanId) -> bool {
        self.entry(id).is_some()
    }

    /// First span matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&HighlightedSpan) -> bool) -> Option<&HighlightedSpan> {
        self.spans().find(|span| predicate(*span))
    }

    pub fn find_by_text(&self, text: &str) -> Option<&HighlightedSpan> {
        self.find(|span| span.text == text)
    }

    pub fn spans(&self) -> impl Iterator<Item = &HighlightedSpan> {
        self.entries.iter().map(|e| &e.span)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handles of the span's highlighted occurrences. Empty if absent.
    pub fn handles(&self, id: SpanId) -> &[AnnotationHandle] {
        self.entry(id).map(|e| e.handles.as_slice()).unwrap_or(&[])
    }

    /// Record a new highlighted occurrence. Returns false if the span is gone.
    pub fn attach_handle(&mut self, id: SpanId, handle: AnnotationHandle) -> bool {
        match self.entries.iter_mut().find(|e| e.span.id == id) {
            Some(entry) => {
                entry.handles.push(handle);
                true
            }
            None => false,
        }
    }

    /// Keep only the handles for which `keep` returns true.
    pub fn retain_handles(&mut self, id: SpanId, keep: impl FnMut(&AnnotationHandle) -> bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.span.id == id) {
            entry.handles.retain(keep);
        }
    }

    fn entry(&self, id: SpanId) -> Option<&SpanEntry> {
        self.entries.iter().find(|e| e.span.id == id)
    }
}
