use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Durable per-mesh state; maps to `<root>/<mesh>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Mesh name; matches the directory this config lives in.
    pub mesh: String,
    /// Named peers. Keys are agent names, unique within the mesh.
    pub peers: BTreeMap<String, PeerEntry>,
    pub security: SecurityConfig,
    pub listener: ListenerConfig,
    /// When set, self-registration advertises an `https` URL and operators
    /// terminate TLS in front of the listener.
    pub tls: Option<TlsConfig>,
    pub daemon: DaemonSettings,
}

/// One peer in the mesh roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Base URL, `scheme://host:port`.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Accepted drift between a message timestamp and local time.
    pub replay_window_seconds: u64,
    /// Per-message body cap enforced before parsing.
    pub max_message_size_bytes: usize,
    /// Reject invite `jti` replay at the bootstrap surface.
    pub strict_invites: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            replay_window_seconds: 60,
            max_message_size_bytes: 262_144,
            strict_invites: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub host: String,
    /// `0` asks the OS for a free port; the runtime reports the actual one.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Queue drain cadence for the autonomous loop.
    pub poll_interval_secs: u64,
    /// Add this agent to the local peer map on startup.
    pub auto_register: bool,
    /// Manifest head polling cadence.
    pub sync_interval_secs: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            auto_register: true,
            sync_interval_secs: 300,
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            mesh: String::new(),
            peers: BTreeMap::new(),
            security: SecurityConfig::default(),
            listener: ListenerConfig::default(),
            tls: None,
            daemon: DaemonSettings::default(),
        }
    }
}

impl MeshConfig {
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            ..Default::default()
        }
    }

    /// Insert or replace a peer by name.
    pub fn upsert_peer(&mut self, name: impl Into<String>, entry: PeerEntry) {
        self.peers.insert(name.into(), entry);
    }

    pub fn remove_peer(&mut self, name: &str) -> bool {
        self.peers.remove(name).is_some()
    }

    /// The scheme this mesh advertises for itself.
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() { "https" } else { "http" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MeshConfig::new("prod");
        assert_eq!(config.security.replay_window_seconds, 60);
        assert_eq!(config.security.max_message_size_bytes, 262_144);
        assert!(!config.security.strict_invites);
        assert_eq!(config.listener.port, 0);
        assert_eq!(config.daemon.poll_interval_secs, 2);
        assert_eq!(config.daemon.sync_interval_secs, 300);
        assert!(config.daemon.auto_register);
    }

    #[test]
    fn scheme_follows_tls() {
        let mut config = MeshConfig::new("prod");
        assert_eq!(config.scheme(), "http");
        config.tls = Some(TlsConfig {
            cert_path: "/etc/weft/cert.pem".into(),
            key_path: "/etc/weft/key.pem".into(),
        });
        assert_eq!(config.scheme(), "https");
    }

    #[test]
    fn peer_upsert_replaces() {
        let mut config = MeshConfig::new("prod");
        config.upsert_peer("bob", PeerEntry { url: "http://a:1".into(), description: None });
        config.upsert_peer("bob", PeerEntry { url: "http://b:2".into(), description: None });
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers["bob"].url, "http://b:2");
        assert!(config.remove_peer("bob"));
        assert!(!config.remove_peer("bob"));
    }

    #[test]
    fn json_round_trip_skips_empty_optionals() {
        let config = MeshConfig::new("prod");
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["peers"].as_object().unwrap().is_empty());
        let back: MeshConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.mesh, "prod");
        assert!(back.tls.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let back: MeshConfig = serde_json::from_str(r#"{"mesh": "lab"}"#).unwrap();
        assert_eq!(back.mesh, "lab");
        assert_eq!(back.security.replay_window_seconds, 60);
    }
}
