//! Debounced, cancellable scheduling of spell-check requests.
//!
//! Every text change restarts the debounce window and supersedes whatever
//! request is in flight. Only the most recently issued, not superseded
//! request may deliver results; anything older that arrives late is dropped.

use std::time::Duration;

use smol_str::SmolStr;
use web_time::Instant;

/// Identifies one issued request. Tickets are ordered by issue time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// A check the caller should send to the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub text: String,
    pub lang: SmolStr,
}

#[derive(Clone, Debug)]
pub struct FetchScheduler {
    debounce: Duration,
    min_text_chars: usize,
    lang: SmolStr,
    generation: u64,
    due_at: Option<Instant>,
    in_flight: Option<FetchTicket>,
}

impl FetchScheduler {
    pub fn new(lang: impl Into<SmolStr>, debounce: Duration, min_text_chars: usize) -> Self {
        Self {
            debounce,
            min_text_chars,
            lang: lang.into(),
            generation: 0,
            due_at: None,
            in_flight: None,
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// When the pending debounce window closes, if one is open.
    pub fn due_at(&self) -> Option<Instant> {
        self.due_at
    }

    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.in_flight
    }

    /// Restart the debounce window.
    ///
    /// Returns the in-flight request this change superseded; the caller should
    /// cancel it. Its result will be rejected by [`complete`](Self::complete)
    /// either way.
    pub fn note_text_change(&mut self, now: Instant) -> Option<FetchTicket> {
        self.generation += 1;
        self.due_at = Some(now + self.debounce);
        let cancelled = self.in_flight.take();
        if let Some(ticket) = cancelled {
            tracing::debug!(generation = ticket.0, "superseded in-flight check");
        }
        cancelled
    }

    /// Issue a request once the debounce window has closed.
    ///
    /// `text` is only read when a request is actually due. Text no longer than
    /// `min_text_chars` is not worth checking and issues nothing.
    pub fn poll(&mut self, now: Instant, text: impl FnOnce() -> String) -> Option<FetchRequest> {
        let due = self.due_at?;
        if now < due {
            return None;
        }
        self.due_at = None;

        let text = text();
        if text.chars().count() <= self.min_text_chars {
            tracing::trace!("text too short, not checking");
            return None;
        }

        let ticket = FetchTicket(self.generation);
        self.in_flight = Some(ticket);
        tracing::debug!(generation = ticket.0, lang = %self.lang, "issuing check");
        Some(FetchRequest {
            ticket,
            text,
            lang: self.lang.clone(),
        })
    }

    /// Whether a response for `ticket` may be applied. Consumes the ticket.
    pub fn complete(&mut self, ticket: FetchTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            tracing::debug!(
                generation = ticket.0,
                current = self.generation,
                "discarding stale check result"
            );
            false
        }
    }

    /// Forget the in-flight request without restarting the window.
    pub fn cancel_in_flight(&mut self) -> Option<FetchTicket> {
        self.in_flight.take()
    }
}
