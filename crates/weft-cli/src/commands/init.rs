use weft_config::{ListenerConfig, MeshConfig, StatePaths};
use weft_mesh::{ManifestPayload, init_mesh};

pub(super) fn cmd_init(paths: &StatePaths, host: String, port: u16) -> weft_core::Result<()> {
    let mut config = MeshConfig::new(paths.mesh());
    config.listener = ListenerConfig { host, port };

    let envelope = init_mesh(paths, config)?;
    let payload = ManifestPayload::from_envelope(&envelope)?;

    println!("Mesh '{}' initialized", paths.mesh());
    println!("  State:      {}", paths.mesh_dir().display());
    println!("  Root key:   {} (keep offline)", paths.root_key().display());
    println!("  Manifest:   v{} ({})", payload.version, envelope.kid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_writes_mesh_state() {
        let tmp = TempDir::new().unwrap();
        let paths = StatePaths::with_roots(tmp.path(), tmp.path().join("admin"), "prod");
        cmd_init(&paths, "127.0.0.1".into(), 4700).unwrap();
        assert!(paths.config_file().exists());
        assert!(paths.manifest_file().exists());

        let config = weft_config::load_config(&paths).unwrap();
        assert_eq!(config.listener.port, 4700);
    }
}
