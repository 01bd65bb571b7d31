// End-to-end behaviour of a spell-check session driven through its event API.
//
// Time is simulated: every event carries an explicit instant, so debounce and
// settle windows are crossed deterministically.

use std::time::Duration;

use insta::assert_snapshot;
use spellmark_core::{
    ActionOutcome, AnchorPoint, AnnotatedDocument, CheckOutcome, DetectedError, Effect,
    EditingSurface, EngineConfig, FetchRequest, Language, ResolutionAction, SessionEvent,
    SpellSession,
};
use web_time::Instant;

const DEBOUNCE: Duration = Duration::from_millis(2000);
const SETTLE: Duration = Duration::from_millis(500);

/// A session plus a simulated clock.
struct Harness {
    session: SpellSession<AnnotatedDocument>,
    now: Instant,
}

impl Harness {
    fn new(text: &str) -> Self {
        Self {
            session: SpellSession::new(
                Language::english(),
                AnnotatedDocument::from_text(text),
                &EngineConfig::default(),
            ),
            now: Instant::now(),
        }
    }

    fn advance(&mut self, by: Duration) -> Vec<Effect> {
        self.now += by;
        self.session.handle(SessionEvent::Tick, self.now)
    }

    fn send(&mut self, event: SessionEvent) -> Vec<Effect> {
        self.session.handle(event, self.now)
    }

    fn type_at(&mut self, offset: usize, text: &str) -> Vec<Effect> {
        self.session
            .edit(offset..offset, text, self.now)
            .expect("edit in bounds")
    }

    /// Note an edit, wait out the debounce, and return the issued request.
    fn fetch(&mut self) -> FetchRequest {
        self.send(SessionEvent::TextChanged);
        issued(&self.advance(DEBOUNCE)).expect("a check is issued after the debounce window")
    }

    fn respond(&mut self, request: &FetchRequest, errors: Vec<DetectedError>) -> Vec<Effect> {
        self.send(SessionEvent::CheckCompleted {
            ticket: request.ticket,
            outcome: CheckOutcome::Errors(errors),
        })
    }

    /// Check the current text, answer with `errors`, and let the pass land.
    fn check_and_settle(&mut self, errors: Vec<DetectedError>) -> Vec<Effect> {
        let request = self.fetch();
        self.respond(&request, errors);
        self.advance(SETTLE)
    }

    fn doc(&self) -> &AnnotatedDocument {
        self.session.surface()
    }

    fn click_token(&mut self, token: &str, anchor: AnchorPoint) -> Vec<Effect> {
        let text = self.doc().plain_text();
        let byte = text.find(token).expect("token present");
        let offset = text[..byte].chars().count();
        self.session.click_at(offset, anchor, self.now)
    }
}

fn issued(effects: &[Effect]) -> Option<FetchRequest> {
    effects.iter().find_map(|e| match e {
        Effect::IssueFetch(req) => Some(req.clone()),
        _ => None,
    })
}

fn problim() -> DetectedError {
    DetectedError::new("problim", ["problem", "prelim"])
}

/// Every registered span is highlighted exactly on occurrences of its token,
/// and every highlight belongs to a registered span.
fn assert_surface_matches_registry(session: &SpellSession<AnnotatedDocument>) {
    let doc = session.surface();
    let text: Vec<char> = doc.plain_text().chars().collect();
    for span in session.registry().spans() {
        let ranges = doc.ranges_for(span.id);
        assert!(!ranges.is_empty(), "{} has no highlight", span.id);
        for range in ranges {
            let covered: String = text[range].iter().collect();
            assert_eq!(covered, span.text);
        }
    }
    for annotation in doc.annotations() {
        assert!(session.registry().contains(annotation.span));
    }
}

#[test]
fn test_accepting_a_suggestion_fixes_the_text() {
    let mut h = Harness::new("I have a problim");
    h.check_and_settle(vec![problim()]);

    assert_eq!(h.session.registry().len(), 1);
    assert_snapshot!(h.doc().marked_text(), @"I have a [problim]");
    assert_surface_matches_registry(&h.session);

    let anchor = AnchorPoint::new(120.0, 48.0);
    let effects = h.click_token("problim", anchor);
    let [Effect::MenuChanged(Some(menu))] = effects.as_slice() else {
        panic!("expected the menu to open, got {effects:?}");
    };
    assert_eq!(menu.anchor, anchor);
    assert_eq!(menu.suggestions, vec!["problem", "prelim"]);

    let effects = h.send(SessionEvent::Action(ResolutionAction::AcceptSuggestion(
        "problem".into(),
    )));
    assert_eq!(
        effects,
        vec![
            Effect::Resolved(ActionOutcome::Replaced { occurrences: 1 }),
            Effect::MenuChanged(None),
        ]
    );
    assert_eq!(h.doc().plain_text(), "I have a problem");
    assert!(h.session.menu().is_none());

    h.advance(SETTLE);
    assert!(h.session.registry().is_empty());
    assert!(h.doc().annotations().is_empty());

    // The replacement counts as an edit and is rechecked.
    let request = issued(&h.advance(DEBOUNCE)).expect("recheck after accept");
    assert_eq!(request.text, "I have a problem");
}

#[test]
fn test_ignoring_a_token_keeps_it_unflagged() {
    let mut h = Harness::new("I have a problim");
    h.check_and_settle(vec![problim()]);
    h.click_token("problim", AnchorPoint::new(1.0, 1.0));

    let effects = h.send(SessionEvent::Action(ResolutionAction::Ignore));
    assert_eq!(effects[0], Effect::Resolved(ActionOutcome::Suppressed));
    assert!(h.session.suppression().is_ignored("problim"));

    h.advance(SETTLE);
    assert_eq!(h.doc().plain_text(), "I have a problim");
    assert!(h.session.registry().is_empty());
    assert!(h.doc().annotations().is_empty());

    // The checker still flags it.
    h.check_and_settle(vec![problim()]);
    assert!(h.session.registry().find_by_text("problim").is_none());
    assert_snapshot!(h.doc().marked_text(), @"I have a problim");
}

#[test]
fn test_typing_during_a_check_discards_its_result() {
    let mut h = Harness::new("I have a problim");
    let first = h.fetch();

    let effects = h.type_at(16, " here");
    assert_eq!(effects, vec![Effect::CancelFetch(first.ticket)]);

    // The superseded response arrives anyway.
    h.respond(&first, vec![problim()]);
    assert!(h.session.detected().is_empty());
    assert!(h.advance(SETTLE).is_empty());

    // Nothing is issued until the window after the last keystroke closes.
    assert!(issued(&h.advance(Duration::from_millis(1000))).is_none());
    let second = issued(&h.advance(Duration::from_millis(500))).expect("second check");
    assert_eq!(second.text, "I have a problim here");
    assert!(second.ticket > first.ticket);

    h.respond(&second, vec![problim()]);
    h.advance(SETTLE);
    assert_eq!(h.session.registry().len(), 1);
}

#[test]
fn test_late_response_never_overwrites_newer_one() {
    let mut h = Harness::new("teh problim");
    let a = h.fetch();
    let b = h.fetch();

    h.respond(&b, vec![DetectedError::new("teh", ["the"])]);
    h.respond(&a, vec![problim()]);
    h.advance(SETTLE);

    let tokens: Vec<_> = h.session.registry().spans().map(|s| s.text.clone()).collect();
    assert_eq!(tokens, vec!["teh"]);
}

#[test]
fn test_repeated_results_cause_no_further_mutation() {
    let mut h = Harness::new("teh cat and teh dog");
    let errors = vec![DetectedError::new("teh", ["the"])];
    h.check_and_settle(errors.clone());
    let renders = h.doc().render_count();
    let ids: Vec<_> = h.session.registry().spans().map(|s| s.id).collect();

    let effects = h.check_and_settle(errors);
    let [Effect::Reconciled(report)] = effects.as_slice() else {
        panic!("expected a single pass, got {effects:?}");
    };
    assert!(report.is_noop());
    assert_eq!(h.doc().render_count(), renders);
    assert_eq!(h.session.registry().spans().map(|s| s.id).collect::<Vec<_>>(), ids);
}

#[test]
fn test_suppressed_tokens_never_hold_a_span() {
    let mut h = Harness::new("teh problim is teh worst");
    let errors = vec![DetectedError::new("teh", ["the"]), problim()];
    h.check_and_settle(errors.clone());
    assert_eq!(h.session.registry().len(), 2);

    h.click_token("teh", AnchorPoint::new(0.0, 0.0));
    h.send(SessionEvent::Action(ResolutionAction::AddToDictionary));
    h.advance(SETTLE);

    for _ in 0..3 {
        h.check_and_settle(errors.clone());
        for token in h.session.suppression().dictionary() {
            assert!(h.session.registry().find_by_text(token).is_none());
        }
        assert_surface_matches_registry(&h.session);
    }
    assert_snapshot!(h.doc().marked_text(), @"teh [problim] is teh worst");
}

#[test]
fn test_span_ids_stay_unique_across_passes() {
    let mut h = Harness::new("teh problim");
    let mut seen = Vec::new();
    for round in 0..6 {
        let errors = match round % 3 {
            0 => vec![DetectedError::new("teh", ["the"]), problim()],
            1 => vec![problim()],
            _ => vec![],
        };
        h.check_and_settle(errors);
        let live: Vec<_> = h.session.registry().spans().map(|s| s.id).collect();
        let mut deduped = live.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), live.len());
        seen.extend(live);
    }
    seen.sort();
    seen.dedup();
    // Two fresh spans each time the full list comes back.
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_highlighting_round_trip_preserves_text() {
    let original = "Thé naïve café has a problim, problim!";
    let mut h = Harness::new(original);
    h.check_and_settle(vec![problim()]);
    assert_eq!(h.doc().annotations().len(), 2);
    assert_eq!(h.doc().plain_text(), original);

    h.check_and_settle(vec![]);
    assert!(h.doc().annotations().is_empty());
    assert_eq!(h.doc().plain_text(), original);
}

#[test]
fn test_menu_goes_stale_when_its_span_is_removed() {
    let mut h = Harness::new("I have a problim");
    h.check_and_settle(vec![problim()]);
    let anchor = AnchorPoint::new(5.0, 5.0);
    h.click_token("problim", anchor);

    let effects = h.check_and_settle(vec![]);
    let Some(Effect::MenuChanged(Some(menu))) = effects.last() else {
        panic!("expected a menu refresh, got {effects:?}");
    };
    assert!(menu.stale);
    assert!(menu.suggestions.is_empty());
    assert_eq!(menu.anchor, anchor);

    // Acting on a vanished span does nothing but close the menu.
    let effects = h.send(SessionEvent::Action(ResolutionAction::Ignore));
    assert_eq!(
        effects,
        vec![
            Effect::Resolved(ActionOutcome::Stale),
            Effect::MenuChanged(None)
        ]
    );
    assert!(!h.session.suppression().is_ignored("problim"));
}

#[test]
fn test_unavailable_service_keeps_highlights() {
    let mut h = Harness::new("I have a problim");
    h.check_and_settle(vec![problim()]);

    let request = h.fetch();
    h.send(SessionEvent::CheckCompleted {
        ticket: request.ticket,
        outcome: CheckOutcome::Unavailable,
    });
    assert!(h.advance(SETTLE).is_empty());
    assert_eq!(h.session.registry().len(), 1);
    assert_surface_matches_registry(&h.session);
}
