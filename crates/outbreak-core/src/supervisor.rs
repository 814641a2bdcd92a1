//! The run supervisor.
//!
//! Owns the only write access to the simulation clock and the only
//! authority to end a run. One call to `Supervisor::run` is one simulation:
//!
//! ```text
//! validate config, build mailboxes and injection scheduler   (fatal errors here)
//! build workers, apply defenses, deliver initial messages
//! spawn workers
//! every tick:
//!     drain signals -> advance step -> snapshot mailboxes
//!     -> maybe inject -> evaluate termination
//! cancel workers, wait up to shutdown_grace, abort stragglers
//! build Outcome, persist it, return it
//! ```

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use outbreak_contracts::{
    agent::{AgentId, AgentIdentity, RunId},
    config::SimConfig,
    error::{OutbreakError, OutbreakResult},
    event::{Event, EventKind},
    message::Message,
    outcome::{Outcome, TerminationReason},
};

use crate::clock::SimulationClock;
use crate::injection::{InjectionScheduler, PromptTable};
use crate::lifecycle::{LifecycleController, Limits};
use crate::mailbox::MailboxDirectory;
use crate::memory::AgentMemory;
use crate::signal::{ExplosionReporter, StopHandle, SupervisorSignal};
use crate::traits::{DefenseProvider, EventSink, LanguageModel, ToolExecutor};
use crate::worker::{build_system_prompt, tools_for, AgentSpec, AgentWorker, WorkerReport, WorkerShared};

/// The external collaborators a run is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn LanguageModel>,
    pub executor: Arc<dyn ToolExecutor>,
    pub defense: Arc<dyn DefenseProvider>,
    pub sink: Arc<dyn EventSink>,
}

pub struct Supervisor {
    config: SimConfig,
    agents: Vec<AgentSpec>,
    prompts: PromptTable,
    initial_messages: Vec<Message>,
    collaborators: Collaborators,
    signal_tx: UnboundedSender<SupervisorSignal>,
    signal_rx: UnboundedReceiver<SupervisorSignal>,
    run_id: RunId,
}

impl Supervisor {
    pub fn new(
        config: SimConfig,
        agents: Vec<AgentSpec>,
        prompts: PromptTable,
        collaborators: Collaborators,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            config,
            agents,
            prompts,
            initial_messages: Vec::new(),
            collaborators,
            signal_tx,
            signal_rx,
            run_id: RunId::new(),
        }
    }

    /// Queue a message to be delivered before workers start.
    pub fn with_initial_message(mut self, message: Message) -> Self {
        self.initial_messages.push(message);
        self
    }

    /// Use a run id chosen by the caller, so a sink can be named after it.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// A handle that can end the run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.signal_tx.clone())
    }

    /// Execute one simulation to completion.
    ///
    /// Returns an error only for configuration and injection-selection
    /// problems found before any worker starts, or if the outcome cannot be
    /// persisted.
    pub async fn run(self) -> OutbreakResult<Outcome> {
        let Supervisor {
            config,
            agents,
            prompts,
            initial_messages,
            collaborators,
            signal_tx,
            mut signal_rx,
            run_id,
        } = self;
        let sink = Arc::clone(&collaborators.sink);

        // ── Step 1: Validate and prepare (fatal on error) ────────────────────
        config.validate()?;
        if agents.is_empty() {
            return Err(OutbreakError::ConfigError {
                reason: "roster is empty".to_string(),
            });
        }
        let identities: Vec<AgentIdentity> = agents.iter().map(|a| a.identity.clone()).collect();
        let directory = MailboxDirectory::new(&identities)?;
        let mut injection = InjectionScheduler::new(&config, &identities, prompts)?;
        for message in &initial_messages {
            let known = message.receiver.as_ref().is_some_and(|r| directory.contains(r));
            if !known {
                return Err(OutbreakError::ConfigError {
                    reason: format!("initial message addressed to unknown agent {:?}", message.receiver),
                });
            }
        }

        let clock = Arc::new(SimulationClock::start());
        sink.emit_event(&Event::new(EventKind::SimulationStart, 0).with_details(json!({
            "run_id": run_id.to_string(),
            "num_agents": agents.len(),
            "agents": identities,
            "defense_mode": config.defense_mode,
            "seed": config.seed,
        })));

        // ── Step 2: Build workers with defenses applied ──────────────────────
        let shared = WorkerShared {
            directory: directory.clone(),
            clock: Arc::clone(&clock),
            model: Arc::clone(&collaborators.model),
            executor: Arc::clone(&collaborators.executor),
            sink: Arc::clone(&sink),
            explosions: ExplosionReporter::new(signal_tx.clone()),
            idle_poll: config.idle_poll(),
        };
        let mut workers = Vec::with_capacity(agents.len());
        for spec in &agents {
            workers.push(build_worker(spec, &agents, &config, &collaborators, &directory, shared.clone())?);
        }

        // ── Step 3: Seed the run ─────────────────────────────────────────────
        for message in initial_messages {
            sink.emit_message(&message);
            directory.deliver(message)?;
        }

        // ── Step 4: Spawn workers ────────────────────────────────────────────
        let root = CancellationToken::new();
        let mut tasks: JoinSet<WorkerReport> = JoinSet::new();
        for worker in workers {
            tasks.spawn(worker.run(root.child_token()));
        }
        info!(run_id = %run_id, agents = agents.len(), defense = %config.defense_mode, "simulation started");

        // ── Step 5: Tick until a termination reason is latched ───────────────
        let mut lifecycle = LifecycleController::new(Limits::from(&config), clock.started_at());
        let mut ticker = time::interval(config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                Some(signal) = signal_rx.recv() => {
                    apply_signal(&mut lifecycle, signal, &clock, sink.as_ref());
                }
                _ = ticker.tick() => {}
            }

            while let Ok(signal) = signal_rx.try_recv() {
                apply_signal(&mut lifecycle, signal, &clock, sink.as_ref());
            }

            let step = clock.advance();
            let snapshot = directory.snapshot();
            lifecycle.record_progress(snapshot.total_dequeued, snapshot.latest_dequeue);

            let injected = injection.check_and_inject(snapshot.total_dequeued, step, &directory, sink.as_ref());
            let all_empty = snapshot.all_empty() && !injected;

            if let Some(reason) = lifecycle.evaluate(Instant::now(), all_empty) {
                break reason;
            }
        };

        // ── Step 6: Shut down workers ────────────────────────────────────────
        root.cancel();
        let drained = time::timeout(config.shutdown_grace(), async {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(report) => debug!(
                        agent = %report.agent,
                        processed = report.processed,
                        interrupted = report.interrupted,
                        "worker joined"
                    ),
                    Err(e) => warn!(error = %e, "worker task failed"),
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(remaining = tasks.len(), "workers did not stop within the grace period; aborting");
            tasks.abort_all();
        }

        // ── Step 7: Outcome ──────────────────────────────────────────────────
        let total_steps = clock.current_step();
        let total_messages = lifecycle.total_dequeued();
        let state = lifecycle.into_state();

        if reason == TerminationReason::Deadlock {
            sink.emit_event(&Event::new(EventKind::Deadlock, total_steps).with_details(json!({
                "idle_seconds": Instant::now().saturating_duration_since(state.last_activity).as_secs_f64(),
            })));
        }

        let outcome = Outcome::new(
            reason,
            total_steps,
            total_messages,
            state.explosion_detail,
            clock.elapsed().as_secs_f64(),
            injection.state().clone(),
            config.snapshot(),
        );
        sink.emit_event(&Event::new(EventKind::SimulationEnd, total_steps).with_details(json!({
            "reason": reason,
            "success": outcome.success,
            "total_messages": total_messages,
            "runtime_seconds": outcome.runtime_seconds,
        })));
        sink.finalize(&outcome)?;

        info!(
            reason = %reason,
            success = outcome.success,
            steps = total_steps,
            messages = total_messages,
            "simulation finished"
        );
        Ok(outcome)
    }
}

fn build_worker(
    spec: &AgentSpec,
    team: &[AgentSpec],
    config: &SimConfig,
    collaborators: &Collaborators,
    directory: &MailboxDirectory,
    shared: WorkerShared,
) -> OutbreakResult<AgentWorker> {
    let id = &spec.identity.id;
    let mode = config.defense_mode;
    let instruction = collaborators.defense.instruction(mode)?;
    let vaccine = collaborators.defense.vaccine(mode)?;

    let tools = tools_for(&spec.identity);
    let system_prompt = build_system_prompt(spec, team, &tools, instruction.as_deref());

    let mut memory = AgentMemory::new(config.memory_capacity);
    let vaccine_len = vaccine.len();
    if !vaccine.is_empty() {
        memory.prepend(vaccine);
    }

    let sink = collaborators.sink.as_ref();
    if instruction.is_some() || vaccine_len > 0 {
        sink.emit_event(
            &Event::new(EventKind::DefenseActivated, 0)
                .for_agent(id.clone())
                .with_details(json!({
                    "mode": mode,
                    "instruction": instruction.is_some(),
                    "vaccine_messages": vaccine_len,
                })),
        );
    }
    sink.emit_event(
        &Event::new(EventKind::AgentCreated, 0)
            .for_agent(id.clone())
            .with_details(json!({
                "role": spec.identity.role,
                "tools": tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            })),
    );

    let mailbox = directory
        .get(id)
        .cloned()
        .ok_or_else(|| OutbreakError::UnknownAgent { agent: id.to_string() })?;
    Ok(AgentWorker::new(spec.identity.clone(), system_prompt, memory, mailbox, shared))
}

fn apply_signal(
    lifecycle: &mut LifecycleController,
    signal: SupervisorSignal,
    clock: &SimulationClock,
    sink: &dyn EventSink,
) {
    match signal {
        SupervisorSignal::Explosion(detail) => {
            if lifecycle.is_running() {
                sink.emit_event(
                    &Event::new(EventKind::Explosion, detail.step)
                        .for_agent(detail.caller.clone())
                        .with_details(json!({
                            "risk_type": detail.risk_type,
                            "description": detail.description,
                            "code_preview": detail.code_preview,
                            "observed_at_step": clock.current_step(),
                        })),
                );
            }
            lifecycle.record_explosion(detail);
        }
        SupervisorSignal::Stop(reason) => {
            debug!(%reason, "stop requested");
            lifecycle.request_stop(reason);
        }
    }
}

/// Address a task message from the system to `receiver`.
pub fn task_message(receiver: AgentId, content: impl Into<String>) -> Message {
    Message::new(outbreak_contracts::message::MessageRole::User, content, 0)
        .from_sender(AgentId::system())
        .to_receiver(receiver)
}
