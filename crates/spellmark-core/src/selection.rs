//! Suggestion-menu selection state machine.
//!
//! ```text
//! Closed --SpanClicked(S, P)--> Open(S, P)
//! Open   --SpanClicked(_, _)--> Open        (no-op: never re-anchors)
//! Open   --ClickedOutside-----> Closed
//! Open   --Escape-------------> Closed
//! ```

use smol_str::SmolStr;

use crate::registry::SpanRegistry;
use crate::types::{AnchorPoint, SpanId};

/// Whether the suggestion menu is open, and for which span.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Closed,
    Open { span: SpanId, anchor: AnchorPoint },
}

/// Input to the selection machine, routed up from the editing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionEvent {
    /// A click landed on a highlighted span.
    SpanClicked { span: SpanId, anchor: AnchorPoint },
    /// A click landed anywhere that is not a highlighted span.
    ClickedOutside,
    Escape,
}

/// Result of feeding an event to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    Unchanged,
}

/// What the menu should show.
#[derive(Clone, Debug, PartialEq)]
pub struct MenuView {
    pub anchor: AnchorPoint,
    pub span: SpanId,
    /// The selected token, or None if the span has since been removed.
    pub token: Option<SmolStr>,
    pub suggestions: Vec<SmolStr>,
    /// The span vanished while the menu was open; render the "no suggestions" fallback.
    pub stale: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionMachine {
    state: SelectionState,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SelectionState::Open { .. })
    }

    pub fn selected_span(&self) -> Option<SpanId> {
        match self.state {
            SelectionState::Open { span, .. } => Some(span),
            SelectionState::Closed => None,
        }
    }

    /// Feed one event. Opening requires the span to be registered.
    pub fn handle(&mut self, event: SelectionEvent, registry: &SpanRegistry) -> Transition {
        match (self.state, event) {
            (SelectionState::Closed, SelectionEvent::SpanClicked { span, anchor }) => {
                if !registry.contains(span) {
                    tracing::debug!(%span, "click on unregistered span ignored");
                    return Transition::Unchanged;
                }
                self.state = SelectionState::Open { span, anchor };
                Transition::Opened
            }
            (SelectionState::Closed, _) => Transition::Unchanged,
            (SelectionState::Open { .. }, SelectionEvent::SpanClicked { .. }) => {
                Transition::Unchanged
            }
            (
                SelectionState::Open { .. },
                SelectionEvent::ClickedOutside | SelectionEvent::Escape,
            ) => {
                self.close();
                Transition::Closed
            }
        }
    }

    /// Close the menu, clearing the selected span and anchor.
    pub fn close(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = SelectionState::Closed;
        was_open
    }

    /// The menu contents, or None when closed.
    pub fn menu(&self, registry: &SpanRegistry) -> Option<MenuView> {
        let SelectionState::Open { span, anchor } = self.state else {
            return None;
        };
        Some(match registry.get(span) {
            Some(selected) => MenuView {
                anchor,
                span,
                token: Some(selected.text.clone()),
                suggestions: selected.suggestions.clone(),
                stale: false,
            },
            None => MenuView {
                anchor,
                span,
                token: None,
                suggestions: Vec::new(),
                stale: true,
            },
        })
    }
}
