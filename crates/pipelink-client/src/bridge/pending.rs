//! Nonce -> in-flight request table.
//!
//! Entries are inserted by the worker when a command is written and removed
//! when any inbound envelope echoes the nonce. On disconnect every entry is
//! abandoned silently: no error is synthesized and nothing is retried.

use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

use pipelink_core::protocol::Command;

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub command: Command,
    pub sent_at: Instant,
}

#[derive(Default)]
pub struct PendingTable {
    inner: DashMap<String, PendingRequest>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn insert(&self, nonce: String, command: Command) {
        self.inner.insert(
            nonce,
            PendingRequest {
                command,
                sent_at: Instant::now(),
            },
        );
    }

    /// Remove and return the entry for `nonce`, if one is waiting.
    pub fn resolve(&self, nonce: &str) -> Option<PendingRequest> {
        self.inner.remove(nonce).map(|(_, req)| req)
    }

    pub fn contains(&self, nonce: &str) -> bool {
        self.inner.contains_key(nonce)
    }

    /// Drop every entry. Returns how many were abandoned.
    pub fn abandon_all(&self) -> usize {
        let n = self.inner.len();
        if n > 0 {
            let nonces: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
            debug!(count = n, ?nonces, "abandoning pending requests");
        }
        self.inner.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_removes_only_matching_nonce() {
        let t = PendingTable::new();
        t.insert("1".into(), Command::SetActivity);
        t.insert("2".into(), Command::Subscribe);

        let hit = t.resolve("2").expect("pending");
        assert_eq!(hit.command, Command::Subscribe);
        assert!(t.resolve("2").is_none());
        assert!(t.resolve("99").is_none());
        assert!(t.contains("1"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn abandon_clears_everything() {
        let t = PendingTable::new();
        for n in 0..5 {
            t.insert(n.to_string(), Command::SetActivity);
        }
        assert_eq!(t.abandon_all(), 5);
        assert!(t.is_empty());
        assert_eq!(t.abandon_all(), 0);
    }
}
