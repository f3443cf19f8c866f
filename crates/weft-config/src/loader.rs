//! Loading and saving mesh state.
//!
//! Saves are write-then-rename so a crash never leaves a torn `config.json`.
//! `update_config` re-reads the file immediately before mutating, which keeps
//! the lost-update window between concurrently starting agents small.

use std::fs;

use tracing::debug;

use weft_core::{Result, WeftError};

use crate::paths::StatePaths;
use crate::schema::MeshConfig;

/// Load the mesh config, with env overrides applied.
pub fn load_config(paths: &StatePaths) -> Result<MeshConfig> {
    let path = paths.config_file();
    if !path.exists() {
        return Err(WeftError::Dependency(format!(
            "mesh '{}' is not initialized (missing {})",
            paths.mesh(),
            path.display()
        )));
    }
    let raw = fs::read_to_string(&path)?;
    let config: MeshConfig = serde_json::from_str(&raw)
        .map_err(|e| WeftError::Protocol(format!("failed to parse {}: {e}", path.display())))?;
    Ok(apply_env_overrides(config))
}

/// Atomically persist the mesh config.
pub fn save_config(paths: &StatePaths, config: &MeshConfig) -> Result<()> {
    paths.ensure_dirs()?;
    let path = paths.config_file();
    let tmp = path.with_extension("json.tmp");
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(&tmp, raw)?;
    fs::rename(&tmp, &path)?;
    debug!(path = %path.display(), "mesh config saved");
    Ok(())
}

/// Re-read the on-disk config, apply `mutate`, and save the result.
///
/// Returns the config as written.
pub fn update_config<F>(paths: &StatePaths, mutate: F) -> Result<MeshConfig>
where
    F: FnOnce(&mut MeshConfig),
{
    let mut config = load_config(paths)?;
    mutate(&mut config);
    save_config(paths, &config)?;
    Ok(config)
}

fn apply_env_overrides(mut config: MeshConfig) -> MeshConfig {
    if let Ok(listen) = std::env::var("WEFT_LISTEN") {
        if let Some((host, port)) = listen.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                config.listener.host = host.to_string();
                config.listener.port = port;
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PeerEntry;
    use tempfile::TempDir;

    fn paths(tmp: &TempDir) -> StatePaths {
        StatePaths::with_roots(tmp.path(), tmp.path().join("admin"), "lab")
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        let mut config = MeshConfig::new("lab");
        config.upsert_peer(
            "alice",
            PeerEntry { url: "http://127.0.0.1:4700".into(), description: None },
        );
        save_config(&paths, &config).unwrap();

        let loaded = load_config(&paths).unwrap();
        assert_eq!(loaded.mesh, "lab");
        assert_eq!(loaded.peers["alice"].url, "http://127.0.0.1:4700");
    }

    #[test]
    fn missing_config_is_dependency_error() {
        let tmp = TempDir::new().unwrap();
        let res = load_config(&paths(&tmp));
        assert!(matches!(res, Err(WeftError::Dependency(_))));
    }

    #[test]
    fn corrupt_config_is_protocol_error() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        paths.ensure_dirs().unwrap();
        fs::write(paths.config_file(), "{not json").unwrap();
        assert!(matches!(load_config(&paths), Err(WeftError::Protocol(_))));
    }

    #[test]
    fn update_rereads_before_writing() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        save_config(&paths, &MeshConfig::new("lab")).unwrap();

        // Simulate a concurrent writer adding a peer between our load and update.
        update_config(&paths, |c| {
            c.upsert_peer("bob", PeerEntry { url: "http://b:1".into(), description: None });
        })
        .unwrap();
        let updated = update_config(&paths, |c| {
            c.upsert_peer("carol", PeerEntry { url: "http://c:1".into(), description: None });
        })
        .unwrap();

        assert!(updated.peers.contains_key("bob"), "earlier write survives");
        assert!(updated.peers.contains_key("carol"));
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        save_config(&paths, &MeshConfig::new("lab")).unwrap();
        assert!(!paths.config_file().with_extension("json.tmp").exists());
    }
}
