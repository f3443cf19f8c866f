//! First-time mesh creation.

use tracing::info;

use weft_config::{MeshConfig, StatePaths, save_config};
use weft_core::{Result, WeftError};
use weft_crypto::{
    SignedEnvelope, encode_transport_secret, generate_signing_key, generate_transport_secret,
    save_signing_key, save_transport_secret, save_verifying_key,
};

use crate::manifest::{ManifestStore, update_manifest};

/// Create a new mesh: state directories, transport secret, root keypair
/// (private half under the admin root), and manifest v1.
pub fn init_mesh(paths: &StatePaths, config: MeshConfig) -> Result<SignedEnvelope> {
    if paths.config_file().exists() {
        return Err(WeftError::Conflict(format!(
            "mesh '{}' is already initialized",
            paths.mesh()
        )));
    }
    paths.ensure_dirs()?;
    paths.ensure_admin_dir()?;

    let secret = generate_transport_secret();
    save_transport_secret(&paths.mesh_key(), &secret)?;

    let root_key = generate_signing_key();
    save_signing_key(&paths.root_key(), &root_key)?;
    save_verifying_key(&paths.root_pub(), &root_key.verifying_key())?;

    save_config(paths, &config)?;

    let store = ManifestStore::new(paths.manifest_file());
    let envelope = update_manifest(&store, &config, &root_key, &encode_transport_secret(&secret))?;

    info!(mesh = %paths.mesh(), "mesh initialized");
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestPayload;
    use tempfile::TempDir;
    use weft_crypto::{load_signing_key, load_transport_secret, load_verifying_key, verify_envelope};

    #[test]
    fn init_creates_all_state() {
        let tmp = TempDir::new().unwrap();
        let paths = StatePaths::with_roots(tmp.path(), tmp.path().join("admin"), "prod");
        let envelope = init_mesh(&paths, MeshConfig::new("prod")).unwrap();

        assert!(paths.config_file().exists());
        assert!(paths.mesh_key().exists());
        assert!(paths.root_pub().exists());
        assert!(paths.root_key().exists());
        assert!(paths.manifest_file().exists());

        let payload = ManifestPayload::from_envelope(&envelope).unwrap();
        assert_eq!(payload.version, 1);
        assert_eq!(payload.mesh, "prod");

        // The manifest verifies under the pinned public key and embeds the
        // same secret that was written to disk.
        let root_pub = load_verifying_key(&paths.root_pub()).unwrap();
        verify_envelope(&root_pub, &envelope).unwrap();
        let secret = load_transport_secret(&paths.mesh_key()).unwrap();
        assert_eq!(payload.transport.mesh_key, encode_transport_secret(&secret));

        // Root private key round-trips from the admin location.
        let root_key = load_signing_key(&paths.root_key()).unwrap();
        assert_eq!(root_key.verifying_key(), root_pub);
    }

    #[test]
    fn double_init_is_a_conflict() {
        let tmp = TempDir::new().unwrap();
        let paths = StatePaths::with_roots(tmp.path(), tmp.path().join("admin"), "prod");
        init_mesh(&paths, MeshConfig::new("prod")).unwrap();
        assert!(matches!(
            init_mesh(&paths, MeshConfig::new("prod")),
            Err(WeftError::Conflict(_))
        ));
    }
}
