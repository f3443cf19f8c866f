//! Invite consumption tracking for strict mode.

use std::collections::HashSet;

use parking_lot::Mutex;
use uuid::Uuid;

/// Predicate consulted by the bootstrap surface when strict invite mode is
/// enabled. Implementations decide how durably consumption is recorded.
pub trait ConsumptionStore: Send + Sync {
    /// Record `jti` as consumed. Returns `false` when it was already consumed.
    fn consume(&self, jti: &Uuid) -> bool;

    fn is_consumed(&self, jti: &Uuid) -> bool;
}

/// In-memory consumption record, scoped to the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryConsumption {
    seen: Mutex<HashSet<Uuid>>,
}

impl MemoryConsumption {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsumptionStore for MemoryConsumption {
    fn consume(&self, jti: &Uuid) -> bool {
        self.seen.lock().insert(*jti)
    }

    fn is_consumed(&self, jti: &Uuid) -> bool {
        self.seen.lock().contains(jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jti_consumes_exactly_once() {
        let store = MemoryConsumption::new();
        let jti = Uuid::new_v4();
        assert!(!store.is_consumed(&jti));
        assert!(store.consume(&jti));
        assert!(store.is_consumed(&jti));
        assert!(!store.consume(&jti), "second consume must report replay");
    }

    #[test]
    fn distinct_jtis_are_independent() {
        let store = MemoryConsumption::new();
        assert!(store.consume(&Uuid::new_v4()));
        assert!(store.consume(&Uuid::new_v4()));
    }
}
