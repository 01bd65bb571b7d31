//! Runs check requests on the tokio runtime and feeds results back to the session.

use std::collections::HashMap;
use std::sync::Arc;

use spellmark_core::{FetchRequest, FetchTicket, SessionEvent, SpellCheckService};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct CheckDispatcher<C> {
    service: Arc<C>,
    events: mpsc::UnboundedSender<SessionEvent>,
    in_flight: HashMap<FetchTicket, JoinHandle<()>>,
}

impl<C: SpellCheckService + 'static> CheckDispatcher<C> {
    pub fn new(service: Arc<C>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            service,
            events,
            in_flight: HashMap::new(),
        }
    }

    /// Spawn the check. Its outcome arrives as [`SessionEvent::CheckCompleted`].
    pub fn issue(&mut self, request: FetchRequest) {
        self.in_flight.retain(|_, task| !task.is_finished());

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        let ticket = request.ticket;
        let task = tokio::spawn(async move {
            let outcome = service.check(&request.text, &request.lang).await;
            // The receiver is gone only when the shell is shutting down.
            let _ = events.send(SessionEvent::CheckCompleted {
                ticket: request.ticket,
                outcome,
            });
        });
        self.in_flight.insert(ticket, task);
    }

    /// Abort a running check. Returns false if it had already finished.
    pub fn cancel(&mut self, ticket: FetchTicket) -> bool {
        match self.in_flight.remove(&ticket) {
            Some(task) if !task.is_finished() => {
                task.abort();
                tracing::debug!(generation = ticket.generation(), "aborted check");
                true
            }
            _ => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.values().filter(|t| !t.is_finished()).count()
    }
}

impl<C> Drop for CheckDispatcher<C> {
    fn drop(&mut self) {
        for task in self.in_flight.values() {
            task.abort();
        }
    }
}
