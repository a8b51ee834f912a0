//! Replay fingerprints: a short hash of where every buggy ended up.
//!
//! Two replays of the same race must produce the same fingerprint no matter
//! how fast they were played or how often they were paused.

use std::collections::BTreeMap;

use blake3::Hasher;

use buggyrace_core::motion::BuggyState;
use buggyrace_core::race::BuggyId;

pub fn replay_fingerprint(step_index: usize, buggies: &BTreeMap<BuggyId, BuggyState>) -> String {
    let mut hasher = Hasher::new();
    hasher.update(&(step_index as u64).to_le_bytes());
    for (id, state) in buggies {
        hasher.update(id.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&state.distance.to_bits().to_le_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}
