//! Bounded-window duplicate suppression.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// Remembers every accepted nonce for one replay window.
///
/// Safe under concurrent access from parallel HTTP handlers; memory stays
/// bounded at one entry per accepted message in the window because every
/// `check` prunes entries older than `now - window`.
#[derive(Debug)]
pub struct NonceCache {
    seen: DashMap<Uuid, i64>,
    window_ms: i64,
}

impl NonceCache {
    pub fn new(window_secs: u64) -> Self {
        Self {
            seen: DashMap::new(),
            window_ms: (window_secs * 1000) as i64,
        }
    }

    /// Record a nonce observation. Returns `false` when the nonce was
    /// already seen inside the window.
    pub fn check(&self, nonce: Uuid, observed_ms: i64) -> bool {
        self.prune(observed_ms);
        match self.seen.entry(nonce) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(observed_ms);
                true
            }
        }
    }

    fn prune(&self, now_ms: i64) {
        let cutoff = now_ms - self.window_ms;
        self.seen.retain(|_, observed| *observed > cutoff);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
