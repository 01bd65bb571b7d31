//! Annotation reconciler.
//!
//! A reconciliation pass brings the [`SpanRegistry`] back into agreement with
//! the active error set and drives the editing surface to match:
//!
//! 1. Resolve detected errors against the registry and suppression sets.
//! 2. Deactivate: unregister spans that lost their error, clear their highlights.
//! 3. Activate: register one span per newly active token and highlight every
//!    occurrence of it. Tokens no longer present in the text are skipped.
//! 4. Refresh retained spans: highlight occurrences typed since the last pass,
//!    drop spans whose every occurrence is gone.
//!
//! All surface mutations of one pass happen inside one batch, and a pass with
//! nothing to do never touches the surface. Passes are deferred by a short
//! settle delay so they land after the surface's own post-edit sync.

use std::ops::Range;
use std::time::Duration;

use smol_str::SmolStr;
use web_time::Instant;

use crate::registry::SpanRegistry;
use crate::resolver::resolve;
use crate::suppression::SuppressionStore;
use crate::surface::{AnnotationHandle, EditingSurface};
use crate::text::find_occurrences;
use crate::types::{DetectedError, SpanId};

/// What one reconciliation pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Spans registered this pass.
    pub activated: Vec<SpanId>,
    /// Spans unregistered this pass.
    pub deactivated: Vec<SpanId>,
    /// Highlights applied, including refreshed occurrences of retained spans.
    pub annotations_applied: usize,
    /// Highlights cleared.
    pub annotations_cleared: usize,
    /// Active tokens that could not be found in the text.
    pub skipped_stale: Vec<SmolStr>,
}

impl PassReport {
    /// True if the pass changed neither the registry nor the surface.
    pub fn is_noop(&self) -> bool {
        self.activated.is_empty()
            && self.deactivated.is_empty()
            && self.annotations_applied == 0
            && self.annotations_cleared == 0
    }
}

/// Schedules and runs reconciliation passes.
#[derive(Clone, Debug)]
pub struct Reconciler {
    settle_delay: Duration,
    due_at: Option<Instant>,
}

/// Work computed before the surface is touched.
struct Plan {
    deactivate: Vec<SpanId>,
    activate: Vec<(DetectedError, Vec<Range<usize>>)>,
    refresh: Vec<(SpanId, Vec<Range<usize>>)>,
}

impl Plan {
    fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.activate.is_empty() && self.refresh.is_empty()
    }
}

impl Reconciler {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            due_at: None,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Schedule a pass once the surface has settled.
    ///
    /// A later request pushes the deadline out; it never runs a pass sooner.
    pub fn request_pass(&mut self, now: Instant) {
        let at = now + self.settle_delay;
        self.due_at = Some(match self.due_at {
            Some(prev) if prev > at => prev,
            _ => at,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.due_at
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.due_at.is_some_and(|at| now >= at)
    }

    /// Run the scheduled pass if its deadline has passed.
    pub fn poll<S: EditingSurface + ?Sized>(
        &mut self,
        now: Instant,
        detected: &[DetectedError],
        suppression: &SuppressionStore,
        registry: &mut SpanRegistry,
        surface: &mut S,
    ) -> Option<PassReport> {
        if !self.is_due(now) {
            return None;
        }
        self.due_at = None;
        Some(self.run_pass(detected, suppression, registry, surface))
    }

    /// Run one reconciliation pass immediately.
    pub fn run_pass<S: EditingSurface + ?Sized>(
        &mut self,
        detected: &[DetectedError],
        suppression: &SuppressionStore,
        registry: &mut SpanRegistry,
        surface: &mut S,
    ) -> PassReport {
        let text = surface.plain_text();
        let mut report = PassReport::default();

        // Highlights destroyed by edits leave dead handles behind.
        let ids: Vec<SpanId> = registry.spans().map(|s| s.id).collect();
        for &id in &ids {
            registry.retain_handles(id, |h| surface.annotation_range(*h).is_some());
        }

        let plan = self.plan(&text, detected, suppression, registry, surface, &mut report);
        if plan.is_empty() {
            tracing::trace!("reconcile: nothing to do");
            return report;
        }

        surface.begin_batch();

        for id in plan.deactivate {
            if let Some(entry) = registry.unregister(id) {
                for handle in entry.handles {
                    surface.clear_annotation(handle);
                    report.annotations_cleared += 1;
                }
                report.deactivated.push(id);
            }
        }

        for (error, occurrences) in plan.activate {
            let id = registry.register(error.original, error.suggestions).id;
            report.activated.push(id);
            for range in occurrences {
                if let Some(handle) = annotate(surface, range, id) {
                    registry.attach_handle(id, handle);
                    report.annotations_applied += 1;
                }
            }
        }

        for (id, occurrences) in plan.refresh {
            for range in occurrences {
                if let Some(handle) = annotate(surface, range, id) {
                    registry.attach_handle(id, handle);
                    report.annotations_applied += 1;
                }
            }
        }

        surface.end_batch();

        tracing::debug!(
            activated = report.activated.len(),
            deactivated = report.deactivated.len(),
            applied = report.annotations_applied,
            cleared = report.annotations_cleared,
            stale = report.skipped_stale.len(),
            "reconcile pass"
        );
        report
    }

    fn plan<S: EditingSurface + ?Sized>(
        &self,
        text: &str,
        detected: &[DetectedError],
        suppression: &SuppressionStore,
        registry: &SpanRegistry,
        surface: &S,
        report: &mut PassReport,
    ) -> Plan {
        let resolution = resolve(detected, registry.spans(), suppression);
        let mut deactivate: Vec<SpanId> = resolution.to_deactivate.iter().map(|s| s.id).collect();

        let mut activate = Vec::new();
        for error in resolution.to_activate {
            let occurrences = find_occurrences(text, &error.original);
            if occurrences.is_empty() {
                tracing::debug!(token = %error.original, "token not in document, skipping");
                report.skipped_stale.push(error.original);
                continue;
            }
            activate.push((error, occurrences));
        }

        let mut refresh = Vec::new();
        for span in registry.spans() {
            if deactivate.contains(&span.id) {
                continue;
            }
            let live: Vec<Range<usize>> = registry
                .handles(span.id)
                .iter()
                .filter_map(|h| surface.annotation_range(*h))
                .collect();
            let fresh: Vec<Range<usize>> = find_occurrences(text, &span.text)
                .into_iter()
                .filter(|occ| !live.iter().any(|l| overlaps(l, occ)))
                .collect();

            if live.is_empty() && fresh.is_empty() {
                tracing::debug!(span = %span.id, token = %span.text, "span has no occurrences left");
                deactivate.push(span.id);
            } else if !fresh.is_empty() {
                refresh.push((span.id, fresh));
            }
        }

        Plan {
            deactivate,
            activate,
            refresh,
        }
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn annotate<S: EditingSurface + ?Sized>(
    surface: &mut S,
    range: Range<usize>,
    id: SpanId,
) -> Option<AnnotationHandle> {
    match surface.apply_annotation(range, id) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(span = %id, error = %e, "could not apply annotation");
            None
        }
    }
}
