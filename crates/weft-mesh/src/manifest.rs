//! The signed, versioned manifest and its durable store.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use weft_config::{MeshConfig, PeerEntry};
use weft_core::{Result, WeftError};
use weft_crypto::{SignedEnvelope, sign_envelope};

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// The payload inside a manifest envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPayload {
    pub schema_version: u32,
    pub mesh: String,
    /// Strictly increasing across re-signs; durable state never regresses.
    pub version: u64,
    /// ISO-8601.
    pub issued_at: String,
    pub security: ManifestSecurity,
    pub transport: ManifestTransport,
    /// Named peers, keyed by agent name.
    pub agents: BTreeMap<String, PeerEntry>,
    #[serde(default)]
    pub revocations: Revocations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSecurity {
    pub replay_window_seconds: u64,
    pub max_message_size_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTransport {
    /// base64 of the 32-byte transport secret.
    pub mesh_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revocations {
    #[serde(default)]
    pub invite_jti: Vec<Uuid>,
    #[serde(default)]
    pub agents: Vec<String>,
}

impl ManifestPayload {
    /// Decode the payload carried by an envelope without verifying the
    /// signature. Callers that receive envelopes from the network must go
    /// through `weft_crypto::verify_envelope` first.
    pub fn from_envelope(envelope: &SignedEnvelope) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&envelope.payload)
            .map_err(|e| WeftError::Protocol(format!("manifest payload is not base64url: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WeftError::Protocol(format!("invalid manifest payload: {e}")))
    }
}

/// `sha256:<hex>` over the envelope's base64 payload bytes, as served by the
/// bootstrap head endpoint.
pub fn manifest_hash(envelope: &SignedEnvelope) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(envelope.payload.as_bytes())))
}

/// Durable store for the latest signed manifest. Historical versions are not
/// retained.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<SignedEnvelope>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let envelope = serde_json::from_str(&raw).map_err(|e| {
            WeftError::Protocol(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(envelope))
    }

    /// Write-then-rename; partial writes are impossible.
    pub fn save(&self, envelope: &SignedEnvelope) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(envelope)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn current(&self) -> Result<Option<(SignedEnvelope, ManifestPayload)>> {
        match self.load()? {
            Some(envelope) => {
                let payload = ManifestPayload::from_envelope(&envelope)?;
                Ok(Some((envelope, payload)))
            }
            None => Ok(None),
        }
    }

    pub fn current_version(&self) -> Result<Option<u64>> {
        Ok(self.current()?.map(|(_, p)| p.version))
    }

    pub fn next_version(&self) -> Result<u64> {
        Ok(self.current_version()?.unwrap_or(0) + 1)
    }
}

/// Key id for the next signature: reuse the previous one, or derive
/// `root-YYYY-MM-DD` on first creation.
pub fn derive_kid(previous: Option<&str>) -> String {
    match previous {
        Some(kid) => kid.to_string(),
        None => format!("root-{}", Utc::now().format("%Y-%m-%d")),
    }
}

/// Assemble a manifest payload from the current config and transport secret.
pub fn build_payload(
    config: &MeshConfig,
    mesh_key: &str,
    version: u64,
    revocations: Revocations,
) -> ManifestPayload {
    ManifestPayload {
        schema_version: MANIFEST_SCHEMA_VERSION,
        mesh: config.mesh.clone(),
        version,
        issued_at: Utc::now().to_rfc3339(),
        security: ManifestSecurity {
            replay_window_seconds: config.security.replay_window_seconds,
            max_message_size_bytes: config.security.max_message_size_bytes,
        },
        transport: ManifestTransport { mesh_key: mesh_key.to_string() },
        agents: config.peers.clone(),
        revocations,
    }
}

/// Rebuild the manifest from current state, bump the version, re-sign with
/// the root key, and persist. Revocations carry over from the previous
/// manifest.
pub fn update_manifest(
    store: &ManifestStore,
    config: &MeshConfig,
    root_key: &SigningKey,
    mesh_key: &str,
) -> Result<SignedEnvelope> {
    let previous = store.load()?;
    let version = store.next_version()?;
    let kid = derive_kid(previous.as_ref().map(|e| e.kid.as_str()));
    let revocations = match &previous {
        Some(envelope) => ManifestPayload::from_envelope(envelope)?.revocations,
        None => Revocations::default(),
    };
    let payload = build_payload(config, mesh_key, version, revocations);
    let envelope = sign_envelope(root_key, &kid, &payload)?;
    store.save(&envelope)?;
    info!(mesh = %config.mesh, version, kid = %envelope.kid, "manifest signed");
    Ok(envelope)
}
