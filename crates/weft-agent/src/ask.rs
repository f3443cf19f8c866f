//! The pending-ask registry.
//!
//! Every registered ask completes exactly once: resolved by a reply, rejected
//! at its deadline, or rejected when the agent shuts down. Entries are
//! removed on every exit path, so the registry never grows unbounded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use weft_core::{Result, WeftError};

#[derive(Debug)]
enum AskOutcome {
    Resolved(String),
    TimedOut,
    Destroyed,
}

struct Pending {
    tx: oneshot::Sender<AskOutcome>,
    timer: Option<JoinHandle<()>>,
}

/// Pending-reply coordinator, shared between HTTP handlers and timer tasks.
#[derive(Clone, Default)]
pub struct AskRegistry {
    pending: Arc<Mutex<HashMap<Uuid, Pending>>>,
}

/// Handle returned by [`AskRegistry::register`]; await it with
/// [`AskTicket::wait`].
pub struct AskTicket {
    rx: oneshot::Receiver<AskOutcome>,
}

impl AskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending entry for `message_id` with a deadline.
    pub fn register(&self, message_id: Uuid, timeout: Duration) -> AskTicket {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .insert(message_id, Pending { tx, timer: None });

        let pending = Arc::clone(&self.pending);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(entry) = pending.lock().remove(&message_id) {
                debug!(%message_id, "ask deadline reached");
                let _ = entry.tx.send(AskOutcome::TimedOut);
            }
        });

        // The timer may already have fired for very short timeouts; in that
        // case the entry is gone and the handle just joins a finished task.
        if let Some(entry) = self.pending.lock().get_mut(&message_id) {
            entry.timer = Some(timer);
        }

        AskTicket { rx }
    }

    /// Complete the pending ask for `reply_to` with `payload`. Returns
    /// `false` when no entry exists (late or unknown reply; dropped
    /// silently).
    pub fn resolve(&self, reply_to: Uuid, payload: String) -> bool {
        let entry = self.pending.lock().remove(&reply_to);
        match entry {
            Some(pending) => {
                if let Some(timer) = pending.timer {
                    timer.abort();
                }
                let _ = pending.tx.send(AskOutcome::Resolved(payload));
                true
            }
            None => false,
        }
    }

    pub fn has(&self, message_id: Uuid) -> bool {
        self.pending.lock().contains_key(&message_id)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Cancel all timers and reject every pending ask with a terminal error.
    pub fn destroy(&self) {
        let drained: Vec<(Uuid, Pending)> = self.pending.lock().drain().collect();
        for (message_id, pending) in drained {
            debug!(%message_id, "rejecting pending ask on shutdown");
            if let Some(timer) = pending.timer {
                timer.abort();
            }
            let _ = pending.tx.send(AskOutcome::Destroyed);
        }
    }
}

impl AskTicket {
    /// Wait for resolution, timeout, or shutdown.
    pub async fn wait(self) -> Result<String> {
        match self.rx.await {
            Ok(AskOutcome::Resolved(payload)) => Ok(payload),
            Ok(AskOutcome::TimedOut) => Err(WeftError::AskTimedOut),
            Ok(AskOutcome::Destroyed) | Err(_) => Err(WeftError::AgentStopped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_completes_the_ticket() {
        let registry = AskRegistry::new();
        let id = Uuid::new_v4();
        let ticket = registry.register(id, Duration::from_secs(5));
        assert!(registry.has(id));

        assert!(registry.resolve(id, "4".into()));
        assert_eq!(ticket.wait().await.unwrap(), "4");
        assert!(!registry.has(id));
    }

    #[tokio::test]
    async fn deadline_rejects_with_timeout() {
        let registry = AskRegistry::new();
        let id = Uuid::new_v4();
        let ticket = registry.register(id, Duration::from_millis(50));

        let err = ticket.wait().await.unwrap_err();
        assert!(matches!(err, WeftError::AskTimedOut));
        assert!(registry.is_empty(), "entry removed at deadline");
    }

    #[tokio::test]
    async fn late_reply_is_dropped() {
        let registry = AskRegistry::new();
        let id = Uuid::new_v4();
        let ticket = registry.register(id, Duration::from_millis(50));
        let _ = ticket.wait().await;

        assert!(!registry.resolve(id, "too late".into()));
    }

    #[tokio::test]
    async fn destroy_rejects_all_pending() {
        let registry = AskRegistry::new();
        let t1 = registry.register(Uuid::new_v4(), Duration::from_secs(30));
        let t2 = registry.register(Uuid::new_v4(), Duration::from_secs(30));
        assert_eq!(registry.len(), 2);

        registry.destroy();
        assert!(matches!(t1.wait().await.unwrap_err(), WeftError::AgentStopped));
        assert!(matches!(t2.wait().await.unwrap_err(), WeftError::AgentStopped));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn resolve_after_resolve_is_false() {
        let registry = AskRegistry::new();
        let id = Uuid::new_v4();
        let ticket = registry.register(id, Duration::from_secs(5));
        assert!(registry.resolve(id, "first".into()));
        assert!(!registry.resolve(id, "second".into()));
        assert_eq!(ticket.wait().await.unwrap(), "first");
    }

    #[tokio::test]
    async fn unknown_reply_is_false() {
        let registry = AskRegistry::new();
        assert!(!registry.resolve(Uuid::new_v4(), "nobody asked".into()));
    }
}
