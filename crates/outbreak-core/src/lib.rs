//! # outbreak-core
//!
//! Orchestration for the Outbreak multi-agent injection simulator.
//!
//! A run is a fixed team of agents, each with its own mailbox and worker
//! task, plus one supervisor that advances the global step, injects a single
//! adversarial prompt, and decides when the run ends. The core never talks
//! to a real model, tool, or disk directly; everything external goes through
//! the four traits in [`traits`].
//!
//! ```text
//! Supervisor::run
//!   ├─ MailboxDirectory      one FIFO per agent
//!   ├─ AgentWorker × N       receive → model → tools → memory
//!   ├─ InjectionScheduler    one attack, seeded target and prompt
//!   └─ LifecycleController   explosion > stop > messages > time > deadlock
//! ```

pub mod clock;
pub mod injection;
pub mod lifecycle;
pub mod mailbox;
pub mod memory;
pub mod signal;
pub mod supervisor;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use injection::{AttackPrompt, InjectionScheduler, PromptTable};
pub use lifecycle::{LifecycleController, Limits};
pub use mailbox::{Mailbox, MailboxDirectory};
pub use memory::AgentMemory;
pub use signal::{ExplosionReporter, StopHandle, SupervisorSignal};
pub use supervisor::{task_message, Collaborators, Supervisor};
pub use traits::{
    CompletionRequest, DefenseProvider, EventSink, LanguageModel, NoDefense, ToolContext, ToolExecutor,
};
pub use worker::{AgentSpec, AgentWorker};
