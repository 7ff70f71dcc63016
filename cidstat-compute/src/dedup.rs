//! # Observation Deduplication
//!
//! Relays re-broadcast what a moving emitter sent, sometimes several times
//! and sometimes late. Counting every copy would weight an emitter by how
//! often it was relayed, so each `(emitter_id, value)` pair is kept once:
//! the copy with the latest timestamp, and on equal timestamps the one that
//! came last in the input.
//!
//! An emitter reporting several distinct values in one window keeps one
//! representative per value.

use std::collections::BTreeMap;

use cidstat_core::{CircularValue, Observation};

/// At most one observation per `(emitter_id, value)`, sorted by that key
pub fn deduplicate(observations: &[Observation]) -> Vec<Observation> {
    let mut latest: BTreeMap<(u16, CircularValue), Observation> = BTreeMap::new();

    for observation in observations {
        let key = (observation.emitter_id, observation.value);
        match latest.get(&key) {
            // Strictly older copies lose; equal timestamps go to the later one
            Some(kept) if observation.timestamp < kept.timestamp => {}
            _ => {
                latest.insert(key, *observation);
            }
        }
    }

    let dropped = observations.len() - latest.len();
    if dropped > 0 {
        tracing::trace!("dedup dropped {} of {} observations", dropped, observations.len());
    }

    latest.into_values().collect()
}
