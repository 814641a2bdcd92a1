//! # outbreak-audit
//!
//! Append-only run log for the Outbreak simulator.
//!
//! ## Overview
//!
//! Both sinks here implement [`EventSink`](outbreak_core::traits::EventSink).
//! Messages are stored as plain records. Events are wrapped in a
//! [`ChainedEvent`] that links to its predecessor by SHA-256 hash, so any
//! edit to a finished `events.jsonl` is detected by [`verify_chain`].
//!
//! - [`JsonlRunLog`]: one directory per run (`messages.jsonl`,
//!   `events.jsonl`, `outcomes.json`)
//! - [`InMemoryRunLog`]: the same chain kept in memory, for tests and
//!   embedding
//!
//! ## Usage
//!
//! ```rust,ignore
//! use outbreak_audit::{JsonlRunLog, read_events, verify_chain};
//!
//! let log = JsonlRunLog::create(Path::new("logs"), &run_id.to_string())?;
//! // ... run the supervisor with `log` as its sink ...
//! assert!(verify_chain(&read_events(log.dir())?));
//! ```

pub mod chain;
pub mod jsonl;
pub mod memory;
pub mod record;

pub use chain::{chain_event, find_break, hash_event, verify_chain};
pub use jsonl::{read_events, read_messages, read_outcome, JsonlRunLog};
pub use memory::InMemoryRunLog;
pub use record::ChainedEvent;

// ── Tests ─────────────────────────────────────────────────────────────────────
