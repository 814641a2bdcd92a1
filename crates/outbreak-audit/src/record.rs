//! Chained event records.
//!
//! `ChainedEvent` wraps a simulation `Event` with a sequence number and the
//! SHA-256 hashes that link it to its predecessor. It is the line format of
//! `events.jsonl`.

use serde::{Deserialize, Serialize};

use outbreak_contracts::event::Event;

/// A single entry in the hash chain for one run.
///
/// Modifying any field, including those of the embedded `event`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub run_id: String,

    pub event: Event,

    /// Hash of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hash over (run_id, sequence, prev_hash, canonical JSON of event).
    pub this_hash: String,
}

impl ChainedEvent {
    /// The `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}
