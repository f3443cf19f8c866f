//! Manifest adoption and the sync poller.
//!
//! An enrolled host polls the bootstrap head of a peer, and when the mesh
//! has moved on, fetches the latest envelope, verifies it against the pinned
//! root key, refuses version regressions, and atomically rewrites its local
//! state from the payload.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use weft_config::{MeshConfig, StatePaths, load_config, save_config};
use weft_core::{Result, WeftError};
use weft_crypto::{
    SignedEnvelope, load_verifying_key, save_transport_secret, verify_envelope,
};
use weft_mesh::{ManifestPayload, ManifestStore, manifest_hash};

use crate::peer::ClientError;

/// Response of `GET /mesh/bootstrap/head`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadInfo {
    pub mesh: String,
    pub version: u64,
    pub manifest_hash: String,
    pub issued_at: String,
}

/// Verify a manifest envelope and materialize it into local state:
/// `manifest.json`, `mesh.key`, and the peer set and security parameters in
/// `config.json`. Agents named in `revocations.agents` are dropped from the
/// adopted peer set.
pub fn adopt_manifest(
    paths: &StatePaths,
    root_pub: &VerifyingKey,
    envelope: &SignedEnvelope,
) -> Result<ManifestPayload> {
    verify_envelope(root_pub, envelope)
        .map_err(|e| WeftError::Verification(e.to_string()))?;
    let payload = ManifestPayload::from_envelope(envelope)?;

    if payload.mesh != paths.mesh() {
        return Err(WeftError::Forbidden(format!(
            "manifest names mesh '{}', expected '{}'",
            payload.mesh,
            paths.mesh()
        )));
    }

    let store = ManifestStore::new(paths.manifest_file());
    if let Some(current) = store.current_version()? {
        if payload.version <= current {
            return Err(WeftError::Precondition(format!(
                "manifest v{} does not advance local v{current}",
                payload.version
            )));
        }
    }

    let secret = BASE64
        .decode(&payload.transport.mesh_key)
        .map_err(|e| WeftError::Verification(format!("manifest mesh key is not base64: {e}")))?;
    paths.ensure_dirs()?;
    save_transport_secret(&paths.mesh_key(), &secret)?;

    let mut config = match load_config(paths) {
        Ok(config) => config,
        Err(WeftError::Dependency(_)) => MeshConfig::new(payload.mesh.clone()),
        Err(e) => return Err(e),
    };
    config.mesh = payload.mesh.clone();
    config.security.replay_window_seconds = payload.security.replay_window_seconds;
    config.security.max_message_size_bytes = payload.security.max_message_size_bytes;
    config.peers = payload
        .agents
        .iter()
        .filter(|(name, _)| !payload.revocations.agents.contains(name))
        .map(|(name, entry)| (name.clone(), entry.clone()))
        .collect();
    save_config(paths, &config)?;

    store.save(envelope)?;
    info!(mesh = %payload.mesh, version = payload.version, "manifest adopted");
    Ok(payload)
}

/// Polls a peer's bootstrap head and adopts newer manifests.
pub struct ManifestSync {
    http: reqwest::Client,
    paths: StatePaths,
    peer_url: String,
    bearer: String,
    interval: Duration,
}

impl ManifestSync {
    pub fn new(
        paths: StatePaths,
        peer_url: impl Into<String>,
        bearer: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            paths,
            peer_url: peer_url.into(),
            bearer: bearer.into(),
            interval,
        }
    }

    /// One head-check. Returns `true` when a newer manifest was adopted.
    pub async fn poll_once(&self) -> std::result::Result<bool, ClientError> {
        let head: HeadInfo = self
            .get_json(&format!("{}/mesh/bootstrap/head", self.peer_url))
            .await?;

        let store = ManifestStore::new(self.paths.manifest_file());
        let local = store.current_version().map_err(ClientError::Core)?;
        if let Some(local) = local {
            if head.version <= local {
                debug!(version = head.version, local, "manifest is current");
                return Ok(false);
            }
        }

        let envelope: SignedEnvelope = self
            .get_json(&format!("{}/mesh/bootstrap/manifest/latest", self.peer_url))
            .await?;

        if manifest_hash(&envelope) != head.manifest_hash {
            return Err(ClientError::Core(WeftError::Verification(
                "fetched manifest does not match advertised hash".into(),
            )));
        }

        let root_pub = load_verifying_key(&self.paths.root_pub()).map_err(ClientError::Core)?;
        adopt_manifest(&self.paths, &root_pub, &envelope).map_err(ClientError::Core)?;
        Ok(true)
    }

    /// Poll until shutdown. Failures are logged and retried at the next tick.
    pub async fn run(self, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(true) => info!("adopted newer manifest"),
                        Ok(false) => {}
                        Err(e) => warn!(error = %e, "manifest sync failed"),
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> std::result::Result<T, ClientError> {
        let resp = self.http.get(url).bearer_auth(&self.bearer).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Shape(e.to_string()))
    }
}
