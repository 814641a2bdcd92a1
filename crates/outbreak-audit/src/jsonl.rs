//! File-backed run log.
//!
//! One directory per run:
//!
//! ```text
//! <base>/<run_dir>/
//!   messages.jsonl   every delivered or produced message, one JSON per line
//!   events.jsonl     ChainedEvent per line (hash chain over events)
//!   outcomes.json    the Outcome, pretty-printed, written once at finalize
//! ```
//!
//! Lines are flushed as they are written so a crashed run still leaves a
//! readable prefix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use outbreak_contracts::{
    error::{OutbreakError, OutbreakResult},
    event::Event,
    message::Message,
    outcome::Outcome,
};
use outbreak_core::traits::EventSink;

use crate::{chain::chain_event, record::ChainedEvent};

pub const MESSAGES_FILE: &str = "messages.jsonl";
pub const EVENTS_FILE: &str = "events.jsonl";
pub const OUTCOME_FILE: &str = "outcomes.json";

fn write_failed(what: &str, e: impl std::fmt::Display) -> OutbreakError {
    OutbreakError::LogWriteFailed {
        reason: format!("{}: {}", what, e),
    }
}

struct JsonlState {
    messages: BufWriter<File>,
    events: BufWriter<File>,
    sequence: u64,
    last_hash: String,
    finalized: bool,
}

pub struct JsonlRunLog {
    run_id: String,
    dir: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlRunLog {
    /// Create `<base>/run_<timestamp>_<run_id prefix>/` and open its files.
    pub fn create(base: &Path, run_id: &str) -> OutbreakResult<Self> {
        let short: String = run_id.chars().take(8).collect();
        let dir = base.join(format!("run_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), short));
        Self::create_in(dir, run_id)
    }

    /// Open a run log in exactly `dir`, creating it if needed.
    pub fn create_in(dir: PathBuf, run_id: &str) -> OutbreakResult<Self> {
        fs::create_dir_all(&dir).map_err(|e| write_failed(&format!("create {}", dir.display()), e))?;
        let open = |name: &str| -> OutbreakResult<BufWriter<File>> {
            let path = dir.join(name);
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map(BufWriter::new)
                .map_err(|e| write_failed(&format!("open {}", path.display()), e))
        };

        let state = JsonlState {
            messages: open(MESSAGES_FILE)?,
            events: open(EVENTS_FILE)?,
            sequence: 0,
            last_hash: ChainedEvent::GENESIS_HASH.to_string(),
            finalized: false,
        };
        debug!(dir = %dir.display(), "run log opened");
        Ok(Self {
            run_id: run_id.to_string(),
            dir,
            state: Mutex::new(state),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn lock(&self) -> OutbreakResult<MutexGuard<'_, JsonlState>> {
        self.state
            .lock()
            .map_err(|e| write_failed("run log lock poisoned", e))
    }
}

fn write_line<T: Serialize>(out: &mut BufWriter<File>, value: &T) -> OutbreakResult<()> {
    serde_json::to_writer(&mut *out, value).map_err(|e| write_failed("serialize record", e))?;
    out.write_all(b"\n").map_err(|e| write_failed("write record", e))?;
    out.flush().map_err(|e| write_failed("flush record", e))
}

impl EventSink for JsonlRunLog {
    fn record_message(&self, message: &Message) -> OutbreakResult<()> {
        let mut state = self.lock()?;
        write_line(&mut state.messages, message)
    }

    fn record_event(&self, event: &Event) -> OutbreakResult<()> {
        let mut state = self.lock()?;
        let entry = chain_event(&self.run_id, state.sequence, event.clone(), state.last_hash.clone());
        write_line(&mut state.events, &entry)?;
        state.sequence += 1;
        state.last_hash = entry.this_hash;
        Ok(())
    }

    fn finalize(&self, outcome: &Outcome) -> OutbreakResult<()> {
        let mut state = self.lock()?;
        if state.finalized {
            return Err(write_failed("finalize", format!("run '{}' already finalized", self.run_id)));
        }

        let path = self.dir.join(OUTCOME_FILE);
        let json = serde_json::to_string_pretty(outcome).map_err(|e| write_failed("serialize outcome", e))?;
        fs::write(&path, json).map_err(|e| write_failed(&format!("write {}", path.display()), e))?;
        state.finalized = true;

        info!(
            run_id = %self.run_id,
            dir = %self.dir.display(),
            event_count = state.sequence,
            terminal_hash = %state.last_hash,
            "run log finalized"
        );
        Ok(())
    }
}

// ── Reading a finished run ────────────────────────────────────────────────────

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> OutbreakResult<Vec<T>> {
    let file = File::open(path).map_err(|e| OutbreakError::ConfigError {
        reason: format!("failed to open '{}': {}", path.display(), e),
    })?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| OutbreakError::ConfigError {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| OutbreakError::ConfigError {
            reason: format!("{} line {}: {}", path.display(), idx + 1, e),
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_events(dir: &Path) -> OutbreakResult<Vec<ChainedEvent>> {
    read_jsonl(&dir.join(EVENTS_FILE))
}

pub fn read_messages(dir: &Path) -> OutbreakResult<Vec<Message>> {
    read_jsonl(&dir.join(MESSAGES_FILE))
}

pub fn read_outcome(dir: &Path) -> OutbreakResult<Outcome> {
    let path = dir.join(OUTCOME_FILE);
    let contents = fs::read_to_string(&path).map_err(|e| OutbreakError::ConfigError {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;
    serde_json::from_str(&contents).map_err(|e| OutbreakError::ConfigError {
        reason: format!("invalid outcome in '{}': {}", path.display(), e),
    })
}
