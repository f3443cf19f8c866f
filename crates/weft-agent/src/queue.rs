//! The incoming-message queue.
//!
//! An ordered FIFO with an optional durable mirror. Persistence happens
//! inside the critical section so the on-disk file always reflects a real
//! in-memory state; mirror failures are logged and never fail the enqueue.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::warn;

use weft_core::{IncomingMessage, Result};

pub struct MessageQueue {
    inner: Mutex<Vec<IncomingMessage>>,
    mirror: Option<PathBuf>,
}

impl MessageQueue {
    /// A queue with no durable mirror.
    pub fn in_memory() -> Self {
        Self { inner: Mutex::new(Vec::new()), mirror: None }
    }

    /// A queue mirrored to `path`. A prior mirror is restored verbatim; an
    /// unreadable or corrupt mirror starts the queue empty rather than
    /// refusing to start.
    pub fn with_mirror(path: PathBuf) -> Self {
        let initial = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "queue mirror corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { inner: Mutex::new(initial), mirror: Some(path) }
    }

    /// Append one message and persist.
    pub fn enqueue(&self, message: IncomingMessage) {
        let mut queue = self.inner.lock();
        queue.push(message);
        self.persist(&queue);
    }

    /// Return all queued messages in FIFO order and clear the queue.
    pub fn drain(&self) -> Vec<IncomingMessage> {
        let mut queue = self.inner.lock();
        let drained = std::mem::take(&mut *queue);
        self.persist(&queue);
        drained
    }

    /// Read-only snapshot.
    pub fn peek(&self) -> Vec<IncomingMessage> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn persist(&self, queue: &[IncomingMessage]) {
        let Some(path) = &self.mirror else { return };
        if let Err(e) = write_mirror(path, queue) {
            warn!(path = %path.display(), error = %e, "queue mirror write failed");
        }
    }
}

fn write_mirror(path: &Path, queue: &[IncomingMessage]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(queue)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use weft_core::MessageType;

    fn msg(n: u32) -> IncomingMessage {
        IncomingMessage {
            id: Uuid::from_u128(n as u128),
            from: "alice".into(),
            payload: format!("payload-{n}"),
            timestamp: 1_700_000_000_000 + n as i64,
            kind: MessageType::Deliver,
            reply_to: None,
        }
    }

    #[test]
    fn drain_preserves_fifo_order() {
        let queue = MessageQueue::in_memory();
        for n in 0..5 {
            queue.enqueue(msg(n));
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), 5);
        for (n, m) in drained.iter().enumerate() {
            assert_eq!(m.id, Uuid::from_u128(n as u128));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let queue = MessageQueue::in_memory();
        queue.enqueue(msg(1));
        assert_eq!(queue.peek().len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn mirror_round_trips_across_restart() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("queues").join("alice").join("queue.json");

        let queue = MessageQueue::with_mirror(path.clone());
        queue.enqueue(msg(1));
        queue.enqueue(msg(2));
        drop(queue);

        let restored = MessageQueue::with_mirror(path);
        let drained = restored.drain();
        assert_eq!(drained, vec![msg(1), msg(2)]);
    }

    #[test]
    fn drain_persists_empty_state() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("queue.json");
        let queue = MessageQueue::with_mirror(path.clone());
        queue.enqueue(msg(1));
        queue.drain();
        drop(queue);

        let restored = MessageQueue::with_mirror(path);
        assert!(restored.is_empty());
    }

    #[test]
    fn corrupt_mirror_starts_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("queue.json");
        fs::write(&path, "{definitely not json").unwrap();
        let queue = MessageQueue::with_mirror(path);
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_enqueues_all_land() {
        use std::sync::Arc;
        let queue = Arc::new(MessageQueue::in_memory());
        let handles: Vec<_> = (0..8u32)
            .map(|n| {
                let queue = queue.clone();
                std::thread::spawn(move || queue.enqueue(msg(n)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(queue.len(), 8);
    }
}
