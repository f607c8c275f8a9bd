//! Protocol statistics counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every counter the node maintains. Incrementing an unregistered name is a
/// silent no-op, so counter call sites never fail.
pub const COUNTER_NAMES: &[&str] = &[
    "bad_sender",
    "bad_network",
    "bad_signature",
    "insufficient_work",
    "malformed_message",
    "unknown_type",
    "blocks_processed",
    "blocks_gapped",
    "forks_observed",
    "votes_processed",
    "vote_replays",
    "keepalives_received",
    "bootstrap_pulls",
    "bootstrap_pushes",
];

/// A thread-safe counter collection for protocol statistics.
pub struct Stats {
    counters: HashMap<&'static str, AtomicU64>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(COUNTER_NAMES)
    }
}

impl Stats {
    pub fn new(names: &[&'static str]) -> Self {
        let mut counters = HashMap::new();
        for &name in names {
            counters.insert(name, AtomicU64::new(0));
        }
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|counter| counter.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&name, counter)| (name, counter.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_and_get() {
        let stats = Stats::default();
        stats.increment("bad_network");
        stats.increment("bad_network");
        stats.add("votes_processed", 5);
        assert_eq!(stats.get("bad_network"), 2);
        assert_eq!(stats.get("votes_processed"), 5);
    }

    #[test]
    fn unknown_counter_is_noop() {
        let stats = Stats::default();
        stats.increment("does_not_exist");
        assert_eq!(stats.get("does_not_exist"), 0);
    }
}
