//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. run_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the event (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use outbreak_contracts::event::Event;

use crate::record::ChainedEvent;

/// Compute the SHA-256 hash for one chained event, as lowercase hex.
///
/// # Panics
///
/// Panics if `event` cannot be serialized to JSON, which cannot happen for
/// the `Event` type.
pub fn hash_event(run_id: &str, sequence: u64, event: &Event, prev_hash: &str) -> String {
    let event_json = serde_json::to_vec(event).expect("Event must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(run_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);

    hex::encode(hasher.finalize())
}

/// Link `event` onto a chain whose last hash is `prev_hash`.
pub fn chain_event(run_id: &str, sequence: u64, event: Event, prev_hash: String) -> ChainedEvent {
    let this_hash = hash_event(run_id, sequence, &event, &prev_hash);
    ChainedEvent {
        sequence,
        run_id: run_id.to_string(),
        event,
        prev_hash,
        this_hash,
    }
}

/// Sequence number of the first entry that breaks the chain, if any.
///
/// An entry breaks the chain if its `sequence` is out of order, its
/// `prev_hash` does not match the previous `this_hash`, or its `this_hash`
/// does not match the recomputed value.
pub fn find_break(events: &[ChainedEvent]) -> Option<u64> {
    let mut expected_prev = ChainedEvent::GENESIS_HASH.to_string();

    for (idx, entry) in events.iter().enumerate() {
        if entry.sequence != idx as u64 || entry.prev_hash != expected_prev {
            return Some(idx as u64);
        }
        let recomputed = hash_event(&entry.run_id, entry.sequence, &entry.event, &entry.prev_hash);
        if entry.this_hash != recomputed {
            return Some(idx as u64);
        }
        expected_prev = entry.this_hash.clone();
    }

    None
}

/// True if the chain is intact. An empty chain is valid.
pub fn verify_chain(events: &[ChainedEvent]) -> bool {
    find_break(events).is_none()
}
