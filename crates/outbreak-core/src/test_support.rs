//! Stub collaborators shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use outbreak_contracts::{
    agent::{AgentId, AgentIdentity, AgentRole},
    error::OutbreakResult,
    event::{Event, EventKind},
    message::Message,
    outcome::Outcome,
    tool::{Completion, ToolInvocation, ToolOutput},
};

use crate::clock::SimulationClock;
use crate::mailbox::MailboxDirectory;
use crate::memory::AgentMemory;
use crate::signal::ExplosionReporter;
use crate::traits::{CompletionRequest, EventSink, LanguageModel, ToolContext, ToolExecutor};
use crate::worker::{AgentWorker, WorkerShared};

#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<Message>>,
    events: Mutex<Vec<Event>>,
    outcome: Mutex<Option<Outcome>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_of(&self, kind: EventKind) -> Vec<Event> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn record_message(&self, message: &Message) -> OutbreakResult<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn record_event(&self, event: &Event) -> OutbreakResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn finalize(&self, outcome: &Outcome) -> OutbreakResult<()> {
        *self.outcome.lock().unwrap() = Some(outcome.clone());
        Ok(())
    }
}

/// A model driven by a closure, with optional simulated latency.
pub struct ScriptedModel<F> {
    respond: F,
    latency: Option<Duration>,
}

impl<F> ScriptedModel<F>
where
    F: Fn(&CompletionRequest<'_>) -> OutbreakResult<Completion> + Send + Sync + 'static,
{
    pub fn new(respond: F) -> Arc<Self> {
        Arc::new(Self { respond, latency: None })
    }

    pub fn slow(latency: Duration, respond: F) -> Arc<Self> {
        Arc::new(Self {
            respond,
            latency: Some(latency),
        })
    }
}

#[async_trait]
impl<F> LanguageModel for ScriptedModel<F>
where
    F: Fn(&CompletionRequest<'_>) -> OutbreakResult<Completion> + Send + Sync + 'static,
{
    async fn complete(&self, request: CompletionRequest<'_>) -> OutbreakResult<Completion> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.respond)(&request)
    }
}

/// Accepts every tool call and does nothing.
pub struct NullExecutor;

#[async_trait]
impl ToolExecutor for NullExecutor {
    async fn execute(&self, _ctx: &ToolContext, call: &ToolInvocation) -> OutbreakResult<ToolOutput> {
        Ok(ToolOutput::ok(format!("{} executed", call.name)))
    }
}

/// A single worker wired to a three-agent directory (Atlas, Bohr, Deng).
pub fn worker_fixture(
    name: &str,
    role: AgentRole,
    model: Arc<dyn LanguageModel>,
    sink: Arc<RecordingSink>,
) -> (AgentWorker, MailboxDirectory) {
    let roster = vec![
        AgentIdentity::new("Atlas", AgentRole::Coordinator),
        AgentIdentity::new("Bohr", AgentRole::Specialist),
        AgentIdentity::new("Deng", AgentRole::Executor),
    ];
    let directory = MailboxDirectory::new(&roster).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let shared = WorkerShared {
        directory: directory.clone(),
        clock: Arc::new(SimulationClock::start()),
        model,
        executor: Arc::new(NullExecutor),
        sink,
        explosions: ExplosionReporter::new(tx),
        idle_poll: Duration::from_millis(100),
    };
    let identity = AgentIdentity::new(name, role);
    let mailbox = Arc::clone(directory.get(&AgentId::new(name)).unwrap());
    let worker = AgentWorker::new(identity, format!("You are {}.", name), AgentMemory::new(50), mailbox, shared);
    (worker, directory)
}
