//! Editing-surface capability and the rope-backed reference surface.
//!
//! The reconciler never re-derives highlights from serialized markup. Every
//! highlight it applies comes back as an [`AnnotationHandle`] into the
//! surface's own run list, and the surface keeps that handle's range correct
//! as text is edited around it.

use std::ops::Range;

use thiserror::Error;

use crate::text::{EditorRope, TextBuffer};
use crate::types::SpanId;

/// Handle to one applied highlight inside a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationHandle(u64);

/// Error type for surface operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceError {
    /// Range does not fit inside the document.
    #[error("range {start}..{end} is outside the document (len {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// Highlights must cover at least one char.
    #[error("cannot annotate an empty range at {0}")]
    EmptyRange(usize),
}

/// What the engine needs from a rich-text editing surface.
///
/// The surface owns the document text. All ranges are char offsets.
pub trait EditingSurface {
    /// Current document as plain text.
    fn plain_text(&self) -> String;

    /// Length of the plain text in chars.
    fn len_chars(&self) -> usize;

    /// Mark `range` as belonging to `span`.
    fn apply_annotation(
        &mut self,
        range: Range<usize>,
        span: SpanId,
    ) -> Result<AnnotationHandle, SurfaceError>;

    /// Remove a highlight. The underlying characters are left untouched.
    /// No-op if the handle is already gone.
    fn clear_annotation(&mut self, handle: AnnotationHandle);

    /// Where the highlight currently sits, or None if an edit destroyed it.
    fn annotation_range(&self, handle: AnnotationHandle) -> Option<Range<usize>>;

    /// The span highlighted at `char_offset`, for routing clicks.
    fn annotation_at(&self, char_offset: usize) -> Option<SpanId>;

    /// Replace the chars in `range` with `text`.
    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<(), SurfaceError>;

    /// Start coalescing mutations into one render.
    fn begin_batch(&mut self) {}

    /// Finish a batch started with `begin_batch`.
    fn end_batch(&mut self) {}
}

/// One highlight in the run list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub handle: AnnotationHandle,
    pub span: SpanId,
    pub range: Range<usize>,
}

/// Reference surface: a text buffer plus a structured list of highlight runs.
///
/// An edit that touches a highlighted run destroys that run; edits before a
/// run shift it, edits after it leave it alone. Inserting exactly at a run's
/// boundary never extends the run.
#[derive(Clone, Debug)]
pub struct AnnotatedDocument<T: TextBuffer = EditorRope> {
    buffer: T,
    annotations: Vec<Annotation>,
    next_handle: u64,
    batch_depth: usize,
    dirty: bool,
    renders: usize,
}

impl<T: TextBuffer + Default> Default for AnnotatedDocument<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl AnnotatedDocument<EditorRope> {
    pub fn from_text(text: &str) -> Self {
        Self::new(EditorRope::from_str(text))
    }
}

impl<T: TextBuffer> AnnotatedDocument<T> {
    pub fn new(buffer: T) -> Self {
        Self {
            buffer,
            annotations: Vec::new(),
            next_handle: 0,
            batch_depth: 0,
            dirty: false,
            renders: 0,
        }
    }

    /// Highlight runs, in the order they were applied.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Ranges currently highlighted for `span`, in document order.
    pub fn ranges_for(&self, span: SpanId) -> Vec<Range<usize>> {
        let mut ranges: Vec<_> = self
            .annotations
            .iter()
            .filter(|a| a.span == span)
            .map(|a| a.range.clone())
            .collect();
        ranges.sort_by_key(|r| r.start);
        ranges
    }

    /// Number of renders the surface has performed. A batch counts once.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Plain text with highlighted runs wrapped in brackets.
    ///
    /// Runs nested inside an already-bracketed run are not bracketed again.
    pub fn marked_text(&self) -> String {
        let text = self.buffer.to_string();
        let mut runs: Vec<&Range<usize>> = self.annotations.iter().map(|a| &a.range).collect();
        runs.sort_by_key(|r| (r.start, std::cmp::Reverse(r.end)));

        let mut out = String::with_capacity(text.len() + runs.len() * 2);
        let mut chars = text.chars();
        let mut pos = 0;
        for run in runs {
            if run.start < pos {
                continue;
            }
            out.extend(chars.by_ref().take(run.start - pos));
            out.push('[');
            out.extend(chars.by_ref().take(run.len()));
            out.push(']');
            pos = run.end;
        }
        out.extend(chars);
        out
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), SurfaceError> {
        let len = self.buffer.len_chars();
        if range.start > range.end || range.end > len {
            return Err(SurfaceError::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }

    fn mark_dirty(&mut self) {
        if self.batch_depth == 0 {
            self.renders += 1;
        } else {
            self.dirty = true;
        }
    }
}

/// Apply a signed delta to a usize, saturating at 0 on underflow.
fn apply_delta(val: usize, delta: isize) -> usize {
    if delta >= 0 {
        val.saturating_add(delta as usize)
    } else {
        val.saturating_sub(delta.unsigned_abs())
    }
}

impl<T: TextBuffer> EditingSurface for AnnotatedDocument<T> {
    fn plain_text(&self) -> String {
        self.buffer.to_string()
    }

    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn apply_annotation(
        &mut self,
        range: Range<usize>,
        span: SpanId,
    ) -> Result<AnnotationHandle, SurfaceError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Err(SurfaceError::EmptyRange(range.start));
        }
        let handle = AnnotationHandle(self.next_handle);
        self.next_handle += 1;
        tracing::trace!(%span, ?range, "apply annotation");
        self.annotations.push(Annotation {
            handle,
            span,
            range,
        });
        self.mark_dirty();
        Ok(handle)
    }

    fn clear_annotation(&mut self, handle: AnnotationHandle) {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.handle != handle);
        if self.annotations.len() != before {
            tracing::trace!(?handle, "clear annotation");
            self.mark_dirty();
        }
    }

    fn annotation_range(&self, handle: AnnotationHandle) -> Option<Range<usize>> {
        self.annotations
            .iter()
            .find(|a| a.handle == handle)
            .map(|a| a.range.clone())
    }

    fn annotation_at(&self, char_offset: usize) -> Option<SpanId> {
        // Innermost run wins; later runs win ties.
        self.annotations
            .iter()
            .filter(|a| a.range.contains(&char_offset))
            .min_by(|a, b| a.range.len().cmp(&b.range.len()).then(b.handle.cmp(&a.handle)))
            .map(|a| a.span)
    }

    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<(), SurfaceError> {
        self.check_range(&range)?;
        let delta = text.chars().count() as isize - range.len() as isize;

        self.annotations.retain_mut(|a| {
            if range.end <= a.range.start {
                a.range = apply_delta(a.range.start, delta)..apply_delta(a.range.end, delta);
                true
            } else {
                range.start >= a.range.end
            }
        });

        self.buffer.replace(range, text);
        self.mark_dirty();
        Ok(())
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && self.dirty {
            self.dirty = false;
            self.renders += 1;
        }
    }
}
