//! In-memory implementation of `EventSink`.
//!
//! `InMemoryRunLog` keeps messages, chained events, and the outcome behind
//! an `Arc<Mutex<_>>`. Clones share the same log, so a test can hand one
//! clone to the supervisor and inspect another afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use outbreak_contracts::{
    error::{OutbreakError, OutbreakResult},
    event::{Event, EventKind},
    message::Message,
    outcome::Outcome,
};
use outbreak_core::traits::EventSink;

use crate::{
    chain::{chain_event, verify_chain},
    record::ChainedEvent,
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    pub(crate) messages: Vec<Message>,
    pub(crate) events: Vec<ChainedEvent>,
    pub(crate) last_hash: String,
    pub(crate) outcome: Option<Outcome>,
}

// ── Public log ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InMemoryRunLog {
    run_id: String,
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRunLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: Arc::new(Mutex::new(InMemoryState {
                messages: Vec::new(),
                events: Vec::new(),
                last_hash: ChainedEvent::GENESIS_HASH.to_string(),
                outcome: None,
            })),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.read().messages.clone()
    }

    pub fn chained_events(&self) -> Vec<ChainedEvent> {
        self.read().events.clone()
    }

    /// The plain events, in record order.
    pub fn events(&self) -> Vec<Event> {
        self.chained_events().into_iter().map(|c| c.event).collect()
    }

    pub fn events_of(&self, kind: EventKind) -> Vec<Event> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.read().outcome.clone()
    }

    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.read().events)
    }

    fn read(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> OutbreakResult<MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| OutbreakError::LogWriteFailed {
            reason: format!("run log lock poisoned: {}", e),
        })
    }
}

// ── EventSink impl ────────────────────────────────────────────────────────────

impl EventSink for InMemoryRunLog {
    fn record_message(&self, message: &Message) -> OutbreakResult<()> {
        self.lock()?.messages.push(message.clone());
        Ok(())
    }

    fn record_event(&self, event: &Event) -> OutbreakResult<()> {
        let mut state = self.lock()?;
        let sequence = state.events.len() as u64;
        let prev_hash = state.last_hash.clone();
        let entry = chain_event(&self.run_id, sequence, event.clone(), prev_hash);
        state.last_hash = entry.this_hash.clone();
        state.events.push(entry);
        Ok(())
    }

    fn finalize(&self, outcome: &Outcome) -> OutbreakResult<()> {
        let mut state = self.lock()?;
        if state.outcome.is_some() {
            return Err(OutbreakError::LogWriteFailed {
                reason: format!("run '{}' already has an outcome", self.run_id),
            });
        }
        state.outcome = Some(outcome.clone());
        info!(
            run_id = %self.run_id,
            event_count = state.events.len(),
            terminal_hash = %state.last_hash,
            "run log finalized"
        );
        Ok(())
    }
}
