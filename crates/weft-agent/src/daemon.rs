//! Daemon lifecycle: PID file, poll loop, and stop handling.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use weft_core::{IncomingMessage, Result};

use crate::runtime::AgentContext;

/// Consumes drained queue batches.
///
/// The LLM-runner integration implements this elsewhere; implementations
/// that spawn children must consume their own child I/O so a long-running
/// subprocess can never block the poll loop on a full pipe.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(&self, batch: Vec<IncomingMessage>) -> Result<()>;
}

/// Default processor: logs the batch and drops it.
pub struct LoggingProcessor;

#[async_trait]
impl BatchProcessor for LoggingProcessor {
    async fn process(&self, batch: Vec<IncomingMessage>) -> Result<()> {
        for message in &batch {
            info!(from = %message.from, id = %message.id, kind = ?message.kind, "drained message");
        }
        Ok(())
    }
}

/// Drain the queue at `interval` and hand non-empty batches to `processor`.
///
/// Batches never overlap: the next tick is not taken until the previous
/// `process` call returns, and missed ticks are delayed rather than bursted.
pub async fn run_poll_loop(
    ctx: Arc<AgentContext>,
    processor: Arc<dyn BatchProcessor>,
    interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let batch = ctx.queue.drain();
                if batch.is_empty() {
                    continue;
                }
                debug!(count = batch.len(), "handing batch to processor");
                if let Err(e) = processor.process(batch).await {
                    warn!(error = %e, "batch processor failed");
                }
            }
            _ = shutdown.notified() => {
                info!("poll loop stopping");
                break;
            }
        }
    }
}

/// PID file marking a live daemon.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process id. Fails if a live daemon already owns the
    /// path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if Self::is_running(&path) {
            return Err(weft_core::WeftError::Conflict(format!(
                "daemon already running (pid file {})",
                path.display()
            )));
        }
        std::fs::write(&path, std::process::id().to_string())?;
        Ok(Self { path })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<u32> {
        let content = std::fs::read_to_string(path)?;
        content
            .trim()
            .parse()
            .map_err(|e| weft_core::WeftError::Protocol(format!("invalid pid file: {e}")))
    }

    /// Whether the recorded process still exists (signal 0 probe).
    pub fn is_running(path: impl AsRef<Path>) -> bool {
        match Self::read(&path) {
            #[cfg(unix)]
            Ok(pid) => unsafe { libc::kill(pid as i32, 0) == 0 },
            #[cfg(not(unix))]
            Ok(_) => false,
            Err(_) => false,
        }
    }

    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = self.remove();
    }
}

/// Gracefully stop a running daemon: SIGTERM, wait up to `grace`, then
/// SIGKILL. Returns `false` when no daemon was running.
#[cfg(unix)]
pub async fn stop_daemon(pid_path: &Path, grace: Duration) -> Result<bool> {
    if !pid_path.exists() {
        return Ok(false);
    }
    let pid = PidFile::read(pid_path)?;
    if !PidFile::is_running(pid_path) {
        // Stale file from a crashed daemon.
        std::fs::remove_file(pid_path)?;
        return Ok(false);
    }

    info!(pid, "sending SIGTERM");
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }

    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if !PidFile::is_running(pid_path) {
            let _ = std::fs::remove_file(pid_path);
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    warn!(pid, "daemon did not exit in time, sending SIGKILL");
    unsafe {
        libc::kill(pid as i32, libc::SIGKILL);
    }
    let _ = std::fs::remove_file(pid_path);
    Ok(true)
}

#[cfg(not(unix))]
pub async fn stop_daemon(_pid_path: &Path, _grace: Duration) -> Result<bool> {
    Err(weft_core::WeftError::Dependency(
        "daemon stop is only supported on unix".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use uuid::Uuid;
    use weft_config::SecurityConfig;
    use weft_core::MessageType;
    use weft_mesh::ManifestStore;

    fn context(tmp: &TempDir) -> Arc<AgentContext> {
        Arc::new(AgentContext::from_parts(
            "alice",
            "lab",
            vec![7u8; 32],
            SecurityConfig::default(),
            ManifestStore::new(tmp.path().join("manifest.json")),
        ))
    }

    fn msg(n: u32) -> IncomingMessage {
        IncomingMessage {
            id: Uuid::from_u128(n as u128),
            from: "bob".into(),
            payload: "x".into(),
            timestamp: weft_core::epoch_millis(),
            kind: MessageType::Deliver,
            reply_to: None,
        }
    }

    struct Collector {
        batches: Mutex<Vec<Vec<IncomingMessage>>>,
    }

    #[async_trait]
    impl BatchProcessor for Collector {
        async fn process(&self, batch: Vec<IncomingMessage>) -> Result<()> {
            self.batches.lock().push(batch);
            Ok(())
        }
    }

    #[tokio::test]
    async fn poll_loop_drains_and_stops() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        ctx.queue.enqueue(msg(1));
        ctx.queue.enqueue(msg(2));

        let collector = Arc::new(Collector { batches: Mutex::new(Vec::new()) });
        let shutdown = Arc::new(Notify::new());

        let loop_handle = tokio::spawn(run_poll_loop(
            ctx.clone(),
            collector.clone(),
            Duration::from_millis(20),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        shutdown.notify_waiters();
        loop_handle.await.unwrap();

        let batches = collector.batches.lock();
        assert_eq!(batches.len(), 1, "one non-empty batch");
        assert_eq!(batches[0].len(), 2);
        assert!(ctx.queue.is_empty());
    }

    #[test]
    fn pid_file_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weft.pid");
        {
            let _pid = PidFile::create(&path).unwrap();
            assert!(path.exists());
            assert_eq!(PidFile::read(&path).unwrap(), std::process::id());
            assert!(PidFile::is_running(&path));
            // A second daemon cannot claim the same file.
            assert!(PidFile::create(&path).is_err());
        }
        // Dropped, so the file is removed.
        assert!(!path.exists());
    }

    #[test]
    fn stale_pid_file_is_not_running() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weft.pid");
        // No live process has pid 0 from our perspective; use an unlikely pid.
        std::fs::write(&path, "999999999").unwrap();
        assert!(!PidFile::is_running(&path));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_without_daemon_is_false() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weft.pid");
        assert!(!stop_daemon(&path, Duration::from_secs(1)).await.unwrap());
    }
}
