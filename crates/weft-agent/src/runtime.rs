//! Agent process wiring.
//!
//! [`AgentContext`] holds everything the HTTP surfaces need: identity,
//! transport secret, queue, nonce cache, ask registry, and the pinned trust
//! material. The listener itself is composed one level up (the CLI binds the
//! socket and hands the context to the server crate).

use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use tokio::sync::Notify;
use tracing::info;
use uuid::Uuid;

use weft_config::{MeshConfig, PeerEntry, SecurityConfig, StatePaths, load_config, update_config};
use weft_core::{IncomingMessage, MeshMessage, MessageType, Result, normalize_peer_url};
use weft_crypto::{encode_transport_secret, load_transport_secret, load_verifying_key};
use weft_mesh::{ConsumptionStore, ManifestStore, MemoryConsumption};

use crate::ask::AskRegistry;
use crate::nonce::NonceCache;
use crate::queue::MessageQueue;

/// Notification hooks fired when a message passes the auth pipeline.
///
/// The core never depends on observer behavior for correctness; both hooks
/// default to no-ops.
pub trait MessageObserver: Send + Sync {
    fn on_message(&self, from: &str, id: Uuid, payload: &str) {
        let _ = (from, id, payload);
    }

    fn on_ask(&self, from: &str, id: Uuid, payload: &str) {
        let _ = (from, id, payload);
    }
}

/// Shared state of one running agent.
pub struct AgentContext {
    pub agent: String,
    pub mesh: String,
    /// Raw 32-byte transport secret; the message MAC key.
    pub secret: Vec<u8>,
    /// base64 form of the secret; the expected bearer token.
    pub secret_b64: String,
    pub security: SecurityConfig,
    pub queue: MessageQueue,
    pub nonces: NonceCache,
    pub asks: AskRegistry,
    pub observer: Option<Arc<dyn MessageObserver>>,
    pub manifest: ManifestStore,
    /// Pinned trust root, when the mesh directory carries one.
    pub root_pub: Option<VerifyingKey>,
    /// Present only in strict invite mode.
    pub consumption: Option<Arc<dyn ConsumptionStore>>,
    pub sync_interval_secs: u64,
}

impl AgentContext {
    /// Load an agent's context from the mesh state directory.
    pub fn load(paths: &StatePaths, agent: &str) -> Result<Self> {
        let config = load_config(paths)?;
        let secret = load_transport_secret(&paths.mesh_key())?;
        let root_pub = if paths.root_pub().exists() {
            Some(load_verifying_key(&paths.root_pub())?)
        } else {
            None
        };
        paths.ensure_queue_dir(agent)?;

        let consumption: Option<Arc<dyn ConsumptionStore>> = config
            .security
            .strict_invites
            .then(|| Arc::new(MemoryConsumption::new()) as Arc<dyn ConsumptionStore>);

        Ok(Self {
            agent: agent.to_string(),
            mesh: config.mesh.clone(),
            secret_b64: encode_transport_secret(&secret),
            secret,
            security: config.security,
            queue: MessageQueue::with_mirror(paths.queue_file(agent)),
            nonces: NonceCache::new(config.security.replay_window_seconds),
            asks: AskRegistry::new(),
            observer: None,
            manifest: ManifestStore::new(paths.manifest_file()),
            root_pub,
            consumption,
            sync_interval_secs: config.daemon.sync_interval_secs,
        })
    }

    /// A context built from parts, for embedding and tests.
    pub fn from_parts(
        agent: impl Into<String>,
        mesh: impl Into<String>,
        secret: Vec<u8>,
        security: SecurityConfig,
        manifest: ManifestStore,
    ) -> Self {
        Self {
            agent: agent.into(),
            mesh: mesh.into(),
            secret_b64: encode_transport_secret(&secret),
            secret,
            security,
            queue: MessageQueue::in_memory(),
            nonces: NonceCache::new(security.replay_window_seconds),
            asks: AskRegistry::new(),
            observer: None,
            manifest,
            root_pub: None,
            consumption: None,
            sync_interval_secs: 300,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MessageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enqueue an accepted non-reply message and fire the matching hook.
    pub fn accept(&self, message: &MeshMessage) {
        self.queue.enqueue(IncomingMessage::from_wire(message));
        if let Some(observer) = &self.observer {
            match message.kind {
                MessageType::Deliver => {
                    observer.on_message(&message.from, message.id, &message.payload)
                }
                MessageType::Ask => observer.on_ask(&message.from, message.id, &message.payload),
                MessageType::Reply => {}
            }
        }
    }

    /// Reject everything still pending; called on shutdown.
    pub fn shutdown(&self) {
        self.asks.destroy();
    }
}

/// Register this agent in the on-disk peer map at its actual listen address.
///
/// Re-reads `config.json` immediately before updating so two agents starting
/// on the same host do not clobber each other's entries. The scheme is
/// `https` iff TLS is configured.
pub fn auto_register(paths: &StatePaths, agent: &str, host: &str, port: u16) -> Result<MeshConfig> {
    let agent = agent.to_string();
    let config = update_config(paths, |config| {
        let url = format!("{}://{}:{}", config.scheme(), host, port);
        if let Ok(url) = normalize_peer_url(&url) {
            config.upsert_peer(&agent, PeerEntry { url, description: None });
        }
    })?;
    info!(agent = %agent, host, port, "agent registered in local peer map");
    Ok(config)
}

/// Forward SIGTERM/SIGINT to a shutdown notifier.
pub fn spawn_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGINT handler");
                    return;
                }
            };
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received ctrl-c, shutting down");
        }
        shutdown.notify_waiters();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use weft_config::save_config;
    use weft_crypto::{generate_transport_secret, save_transport_secret};

    fn seeded_paths(tmp: &TempDir) -> StatePaths {
        let paths = StatePaths::with_roots(tmp.path(), tmp.path().join("admin"), "lab");
        save_config(&paths, &MeshConfig::new("lab")).unwrap();
        save_transport_secret(&paths.mesh_key(), &generate_transport_secret()).unwrap();
        paths
    }

    #[test]
    fn load_builds_a_working_context() {
        let tmp = TempDir::new().unwrap();
        let paths = seeded_paths(&tmp);
        let ctx = AgentContext::load(&paths, "alice").unwrap();
        assert_eq!(ctx.agent, "alice");
        assert_eq!(ctx.mesh, "lab");
        assert_eq!(ctx.secret.len(), 32);
        assert!(ctx.root_pub.is_none());
        assert!(ctx.consumption.is_none(), "strict mode off by default");
    }

    #[test]
    fn strict_invites_enable_consumption() {
        let tmp = TempDir::new().unwrap();
        let paths = StatePaths::with_roots(tmp.path(), tmp.path().join("admin"), "lab");
        let mut config = MeshConfig::new("lab");
        config.security.strict_invites = true;
        save_config(&paths, &config).unwrap();
        save_transport_secret(&paths.mesh_key(), &generate_transport_secret()).unwrap();

        let ctx = AgentContext::load(&paths, "alice").unwrap();
        assert!(ctx.consumption.is_some());
    }

    #[test]
    fn auto_register_rereads_disk_state() {
        let tmp = TempDir::new().unwrap();
        let paths = seeded_paths(&tmp);

        // A concurrent start added bob between our load and registration.
        update_config(&paths, |c| {
            c.upsert_peer("bob", PeerEntry { url: "http://h:1".into(), description: None });
        })
        .unwrap();

        let config = auto_register(&paths, "alice", "127.0.0.1", 4711).unwrap();
        assert_eq!(config.peers["alice"].url, "http://127.0.0.1:4711");
        assert!(config.peers.contains_key("bob"));
    }

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<(String, String)>>,
        asks: Mutex<Vec<(String, String)>>,
    }

    impl MessageObserver for Recorder {
        fn on_message(&self, from: &str, _id: Uuid, payload: &str) {
            self.messages.lock().push((from.into(), payload.into()));
        }
        fn on_ask(&self, from: &str, _id: Uuid, payload: &str) {
            self.asks.lock().push((from.into(), payload.into()));
        }
    }

    #[test]
    fn accept_enqueues_and_notifies() {
        let tmp = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let ctx = AgentContext::from_parts(
            "bob",
            "lab",
            generate_transport_secret().to_vec(),
            SecurityConfig::default(),
            ManifestStore::new(tmp.path().join("manifest.json")),
        )
        .with_observer(recorder.clone());

        let msg = MeshMessage {
            id: Uuid::new_v4(),
            from: "alice".into(),
            to: "bob".into(),
            kind: MessageType::Ask,
            payload: "2+2?".into(),
            reply_to: None,
            timestamp: weft_core::epoch_millis(),
            nonce: Uuid::new_v4(),
            mac: String::new(),
        };
        ctx.accept(&msg);

        assert_eq!(ctx.queue.len(), 1);
        assert_eq!(recorder.asks.lock().len(), 1);
        assert!(recorder.messages.lock().is_empty());
    }
}
