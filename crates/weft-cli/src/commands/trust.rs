use std::path::PathBuf;

use weft_client::adopt_manifest;
use weft_config::{StatePaths, load_config};
use weft_core::{Result, WeftError};
use weft_crypto::{
    decode_invite, encode_public_key, generate_signing_key, load_signing_key, load_verifying_key,
    save_signing_key, save_verifying_key,
};
use weft_mesh::issue_invite;

/// Issue an invite signed by the mesh root key. Run where the admin root is
/// reachable.
pub(super) fn cmd_invite(
    paths: &StatePaths,
    agent: String,
    node_pub_key: String,
    ttl: u64,
    min_manifest_version: Option<u64>,
) -> Result<()> {
    let root_key = load_signing_key(&paths.root_key()).map_err(|_| {
        WeftError::Dependency(format!(
            "root key not found at {} (run on the admin host)",
            paths.root_key().display()
        ))
    })?;

    let seed_hints = match load_config(paths) {
        Ok(config) => config.peers.values().map(|p| p.url.clone()).collect(),
        Err(_) => Vec::new(),
    };

    let token = issue_invite(
        &root_key,
        paths.mesh(),
        &agent,
        &node_pub_key,
        ttl,
        min_manifest_version,
        seed_hints,
    )?;

    println!("{token}");
    Ok(())
}

/// Join a mesh: pin the root key, enroll a host keypair, present the invite
/// to the seed, verify the returned manifest, and materialize local state.
pub(super) async fn cmd_join(seed: String, token: String, root_pub: PathBuf) -> Result<()> {
    let root = load_verifying_key(&root_pub)?;

    // The token names the mesh; the state directory follows it.
    let invite = decode_invite(&root, &token)
        .map_err(|e| WeftError::Verification(format!("invite rejected: {e}")))?;
    let paths = StatePaths::resolve(&invite.mesh);
    paths.ensure_dirs()?;
    save_verifying_key(&paths.root_pub(), &root)?;

    // Host enrollment keypair, created once.
    let node_key = if paths.node_key().exists() {
        load_signing_key(&paths.node_key())?
    } else {
        let key = generate_signing_key();
        save_signing_key(&paths.node_key(), &key)?;
        save_verifying_key(&paths.node_pub(), &key.verifying_key())?;
        key
    };
    let node_pub_b64 = encode_public_key(&node_key.verifying_key());

    let response = weft_client::join(&seed, &token, &node_pub_b64).await?;
    let payload = adopt_manifest(&paths, &root, &response.manifest)?;

    println!("Joined mesh '{}' as agent '{}'", payload.mesh, response.agent);
    println!("  Manifest:  v{}", payload.version);
    println!("  Peers:     {}", payload.agents.len());
    println!("  State:     {}", paths.mesh_dir().display());
    println!("Start the agent with: weft -m {} start {}", payload.mesh, response.agent);
    Ok(())
}
