//! The spell-check session: one actor owning every piece of engine state.
//!
//! Text edits, timer ticks, check responses, clicks, and menu actions are all
//! fed through [`SpellSession::handle`] one at a time, so no two
//! reconciliation passes ever overlap. The session never performs I/O itself;
//! it returns [`Effect`]s for the caller to carry out (issue or cancel a
//! check, redraw the menu).

use std::ops::Range;

use web_time::Instant;

use crate::actions::{ActionOutcome, ResolutionAction};
use crate::config::EngineConfig;
use crate::reconciler::{PassReport, Reconciler};
use crate::registry::SpanRegistry;
use crate::scheduler::{FetchRequest, FetchScheduler, FetchTicket};
use crate::selection::{MenuView, SelectionEvent, SelectionMachine, Transition};
use crate::service::CheckOutcome;
use crate::suppression::SuppressionStore;
use crate::surface::{EditingSurface, SurfaceError};
use crate::types::{AnchorPoint, DetectedError, Language, SpanId};

/// A click routed up from the editing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickEvent {
    /// The highlighted span under the click, if any.
    pub target: Option<SpanId>,
    pub anchor: AnchorPoint,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The surface's text changed.
    TextChanged,
    /// Time passed; run whatever is due.
    Tick,
    /// A check issued earlier has finished.
    CheckCompleted {
        ticket: FetchTicket,
        outcome: CheckOutcome,
    },
    Click(ClickEvent),
    Escape,
    Action(ResolutionAction),
}

/// Work for the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Send this request to the checking service.
    IssueFetch(FetchRequest),
    /// Abort this request if it is still running.
    CancelFetch(FetchTicket),
    /// The menu opened, closed, or changed contents.
    MenuChanged(Option<MenuView>),
    /// A reconciliation pass ran.
    Reconciled(PassReport),
    /// A menu action ran.
    Resolved(ActionOutcome),
}

pub struct SpellSession<S> {
    language: Language,
    surface: S,
    detected: Vec<DetectedError>,
    suppression: SuppressionStore,
    registry: SpanRegistry,
    selection: SelectionMachine,
    reconciler: Reconciler,
    scheduler: FetchScheduler,
}

impl<S: EditingSurface> SpellSession<S> {
    pub fn new(language: Language, surface: S, config: &EngineConfig) -> Self {
        let scheduler =
            FetchScheduler::new(language.key.clone(), config.debounce(), config.min_text_chars);
        Self {
            language,
            surface,
            detected: Vec::new(),
            suppression: SuppressionStore::new(),
            registry: SpanRegistry::new(),
            selection: SelectionMachine::new(),
            reconciler: Reconciler::new(config.settle_delay()),
            scheduler,
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface. Report text edits made through it with
    /// [`SessionEvent::TextChanged`].
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The latest accepted error list.
    pub fn detected(&self) -> &[DetectedError] {
        &self.detected
    }

    pub fn suppression(&self) -> &SuppressionStore {
        &self.suppression
    }

    pub fn registry(&self) -> &SpanRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &SelectionMachine {
        &self.selection
    }

    pub fn menu(&self) -> Option<MenuView> {
        self.selection.menu(&self.registry)
    }

    /// Earliest instant at which a [`SessionEvent::Tick`] has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.due_at(), self.reconciler.due_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply a user edit to the surface and report it.
    pub fn edit(
        &mut self,
        range: Range<usize>,
        text: &str,
        now: Instant,
    ) -> Result<Vec<Effect>, SurfaceError> {
        self.surface.replace_range(range, text)?;
        Ok(self.handle(SessionEvent::TextChanged, now))
    }

    /// Route a click at `char_offset` through the surface's hit testing.
    pub fn click_at(&mut self, char_offset: usize, anchor: AnchorPoint, now: Instant) -> Vec<Effect> {
        let target = self.surface.annotation_at(char_offset);
        self.handle(SessionEvent::Click(ClickEvent { target, anchor }), now)
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            SessionEvent::TextChanged => self.text_changed(now, &mut effects),
            SessionEvent::Tick => self.tick(now, &mut effects),
            SessionEvent::CheckCompleted { ticket, outcome } => {
                self.check_completed(ticket, outcome, now)
            }
            SessionEvent::Click(click) => {
                let event = match click.target {
                    Some(span) => SelectionEvent::SpanClicked {
                        span,
                        anchor: click.anchor,
                    },
                    None => SelectionEvent::ClickedOutside,
                };
                self.select(event, &mut effects);
            }
            SessionEvent::Escape => self.select(SelectionEvent::Escape, &mut effects),
            SessionEvent::Action(action) => self.resolve(action, now, &mut effects),
        }
        effects
    }

    fn text_changed(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        if let Some(cancelled) = self.scheduler.note_text_change(now) {
            effects.push(Effect::CancelFetch(cancelled));
        }
    }

    fn tick(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let surface = &self.surface;
        if let Some(request) = self.scheduler.poll(now, || surface.plain_text()) {
            effects.push(Effect::IssueFetch(request));
        }

        if let Some(report) = self.reconciler.poll(
            now,
            &self.detected,
            &self.suppression,
            &mut self.registry,
            &mut self.surface,
        ) {
            let menu_affected = self
                .selection
                .selected_span()
                .is_some_and(|span| report.deactivated.contains(&span));
            effects.push(Effect::Reconciled(report));
            if menu_affected {
                effects.push(Effect::MenuChanged(self.menu()));
            }
        }
    }

    fn check_completed(&mut self, ticket: FetchTicket, outcome: CheckOutcome, now: Instant) {
        if !self.scheduler.complete(ticket) {
            return;
        }
        match outcome {
            CheckOutcome::Errors(errors) => {
                tracing::debug!(count = errors.len(), lang = %self.language.key, "check result");
                self.detected = errors;
                self.reconciler.request_pass(now);
            }
            CheckOutcome::Unavailable => {
                tracing::debug!(lang = %self.language.key, "check unavailable, keeping previous errors");
            }
        }
    }

    fn select(&mut self, event: SelectionEvent, effects: &mut Vec<Effect>) {
        if self.selection.handle(event, &self.registry) != Transition::Unchanged {
            effects.push(Effect::MenuChanged(self.menu()));
        }
    }

    fn resolve(&mut self, action: ResolutionAction, now: Instant, effects: &mut Vec<Effect>) {
        let selected = self
            .selection
            .selected_span()
            .and_then(|id| self.registry.get(id))
            .cloned();
        let was_open = self.selection.close();

        let outcome = match selected {
            None => ActionOutcome::Stale,
            Some(span) => match action.apply(
                &span,
                &self.registry,
                &mut self.surface,
                &mut self.detected,
                &mut self.suppression,
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(span = %span.id, error = %e, "resolution action failed");
                    ActionOutcome::Stale
                }
            },
        };

        effects.push(Effect::Resolved(outcome));
        if was_open {
            effects.push(Effect::MenuChanged(None));
        }
        match outcome {
            ActionOutcome::Replaced { .. } => {
                self.text_changed(now, effects);
                self.reconciler.request_pass(now);
            }
            ActionOutcome::Suppressed => self.reconciler.request_pass(now),
            ActionOutcome::Stale => {}
        }
    }
}
