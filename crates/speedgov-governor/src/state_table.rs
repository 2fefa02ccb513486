//! The governor's per-torrent state table: single-writer (the tick loop),
//! lock-guarded for concurrent inspection reads.

use std::collections::HashMap;
use std::sync::RwLock;

use speedgov_core::TorrentLimitState;

/// A shared table of [`TorrentLimitState`] keyed by torrent hash.
///
/// Writes happen only from the governor's own tick loop; reads may come
/// from inspection callers (e.g. a CLI or status endpoint) on other tasks,
/// hence the lock. The lock is never held across an `.await` point.
#[derive(Default)]
pub struct StateTable {
    states: RwLock<HashMap<String, TorrentLimitState>>,
}

impl StateTable {
    /// Construct an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table from previously persisted states, e.g. on restart.
    pub fn restore(&self, states: Vec<TorrentLimitState>) {
        let mut guard = self.states.write().expect("lock poisoned");
        guard.clear();
        for state in states {
            guard.insert(state.hash.clone(), state);
        }
    }

    /// Run `f` against the entry for `hash`, inserting `make_default()` if
    /// absent, and return `f`'s result. The only write path used by the
    /// tick loop.
    pub fn with_entry_or_insert<T>(
        &self,
        hash: &str,
        make_default: impl FnOnce() -> TorrentLimitState,
        f: impl FnOnce(&mut TorrentLimitState) -> T,
    ) -> T {
        let mut guard = self.states.write().expect("lock poisoned");
        let entry = guard
            .entry(hash.to_string())
            .or_insert_with(make_default);
        f(entry)
    }

    /// Remove a torrent's state, e.g. after auto-remove deletes it or it
    /// stops appearing in any client enumeration.
    pub fn remove(&self, hash: &str) -> Option<TorrentLimitState> {
        self.states.write().expect("lock poisoned").remove(hash)
    }

    /// Number of torrents currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().expect("lock poisoned").len()
    }

    /// Whether the table holds no torrents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A clone of one torrent's state, for inspection.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<TorrentLimitState> {
        self.states.read().expect("lock poisoned").get(hash).cloned()
    }

    /// A clone of every tracked torrent's state, for inspection or
    /// periodic persistence snapshots.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TorrentLimitState> {
        self.states
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Drop every entry whose hash is not in `seen`, e.g. torrents that
    /// stopped appearing in any client's enumeration this tick.
    pub fn retain_hashes(&self, seen: &std::collections::HashSet<String>) {
        self.states
            .write()
            .expect("lock poisoned")
            .retain(|hash, _| seen.contains(hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(hash: &str) -> TorrentLimitState {
        TorrentLimitState::new(hash, "name", "tracker", 1, 0.0, 0, 1024)
    }

    #[test]
    fn insert_then_get_round_trips() {
        let table = StateTable::new();
        table.with_entry_or_insert("h", || state("h"), |_| ());
        assert!(table.get("h").is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn restore_replaces_existing_contents() {
        let table = StateTable::new();
        table.with_entry_or_insert("old", || state("old"), |_| ());
        table.restore(vec![state("new")]);
        assert!(table.get("old").is_none());
        assert!(table.get("new").is_some());
    }

    #[test]
    fn retain_hashes_drops_unseen_entries() {
        let table = StateTable::new();
        table.with_entry_or_insert("keep", || state("keep"), |_| ());
        table.with_entry_or_insert("drop", || state("drop"), |_| ());
        let mut seen = std::collections::HashSet::new();
        seen.insert("keep".to_string());
        table.retain_hashes(&seen);
        assert!(table.get("keep").is_some());
        assert!(table.get("drop").is_none());
    }
}
