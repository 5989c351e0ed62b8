//! Per-form tracking of outstanding suggestion requests.
//!
//! Each form (the CLO editor, the evaluation summary panel) gets a generation
//! counter. A request takes a [`Ticket`] for the current generation; starting
//! a new request or cancelling the form bumps the generation, so a late
//! response from an older ticket is dropped instead of overwriting newer
//! input.

use std::future::Future;

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, Default)]
struct FormState {
    generation: u64,
    pending: bool,
}

/// Proof that a request was started for a form.
#[derive(Debug, PartialEq, Eq)]
pub struct Ticket {
    form: String,
    generation: u64,
}

impl Ticket {
    pub fn form(&self) -> &str {
        &self.form
    }
}

/// Generation counters keyed by form name.
#[derive(Debug, Default)]
pub struct InflightGate {
    forms: DashMap<String, FormState>,
}

impl InflightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `form`, superseding any request already in flight.
    pub fn begin(&self, form: &str) -> Ticket {
        let mut state = self.forms.entry(form.to_string()).or_default();
        state.generation += 1;
        state.pending = true;
        Ticket {
            form: form.to_string(),
            generation: state.generation,
        }
    }

    /// Whether `ticket` is still the latest request for its form.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.forms
            .get(&ticket.form)
            .is_some_and(|state| state.pending && state.generation == ticket.generation)
    }

    /// Whether `form` has a request outstanding.
    pub fn is_pending(&self, form: &str) -> bool {
        self.forms.get(form).is_some_and(|state| state.pending)
    }

    /// Deliver `result` if `ticket` is still current.
    ///
    /// Consumes the ticket, so each request completes at most once.
    pub fn finish<T>(&self, ticket: Ticket, result: T) -> Option<T> {
        let mut state = self.forms.get_mut(&ticket.form)?;
        if state.pending && state.generation == ticket.generation {
            state.pending = false;
            Some(result)
        } else {
            tracing::debug!(form = %ticket.form, "Dropping stale suggestion response");
            None
        }
    }

    /// Abandon whatever is in flight for `form`.
    pub fn cancel(&self, form: &str) {
        if let Some(mut state) = self.forms.get_mut(form) {
            state.generation += 1;
            state.pending = false;
        }
    }

    /// Run `request` under a fresh ticket for `form`.
    ///
    /// Returns `None` when the form was cancelled or re-requested while
    /// `request` was running.
    pub async fn run<F, T>(&self, form: &str, request: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let ticket = self.begin(form);
        let result = request.await;
        self.finish(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_delivers_once() {
        let gate = InflightGate::new();
        let ticket = gate.begin("clo-form");
        assert!(gate.is_pending("clo-form"));
        assert!(gate.is_current(&ticket));

        assert_eq!(gate.finish(ticket, "Explain X"), Some("Explain X"));
        assert!(!gate.is_pending("clo-form"));
    }

    #[test]
    fn test_newer_request_supersedes() {
        let gate = InflightGate::new();
        let first = gate.begin("clo-form");
        let second = gate.begin("clo-form");

        assert!(!gate.is_current(&first));
        assert_eq!(gate.finish(first, 1), None);
        assert_eq!(gate.finish(second, 2), Some(2));
    }

    #[test]
    fn test_cancel_drops_late_response() {
        let gate = InflightGate::new();
        let ticket = gate.begin("summary");
        gate.cancel("summary");

        assert!(!gate.is_pending("summary"));
        assert_eq!(gate.finish(ticket, "late"), None);
    }

    #[test]
    fn test_forms_are_independent() {
        let gate = InflightGate::new();
        let clo = gate.begin("clo-form");
        let summary = gate.begin("summary");
        gate.cancel("clo-form");

        assert_eq!(gate.finish(clo, ()), None);
        assert_eq!(gate.finish(summary, ()), Some(()));
    }

    #[test]
    fn test_run() {
        let gate = InflightGate::new();
        let value = tokio_test::block_on(gate.run("clo-form", async { 42 }));
        assert_eq!(value, Some(42));
        assert!(!gate.is_pending("clo-form"));
    }
}
