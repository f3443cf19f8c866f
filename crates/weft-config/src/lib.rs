//! # weft-config
//!
//! Mesh state schema and the on-disk layout of a Weft state root.
//!
//! Everything an agent needs at rest lives under `<root>/<mesh>/`:
//! `config.json` (peer set + security parameters + listener), `mesh.key`
//! (transport secret), `root.pub` (pinned trust root), `manifest.json`
//! (latest signed envelope), the host enrollment keypair, and per-agent
//! queue mirrors. The root private key lives under a separate admin root.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::{load_config, save_config, update_config};
pub use paths::StatePaths;
pub use schema::{
    DaemonSettings, ListenerConfig, MeshConfig, PeerEntry, SecurityConfig, TlsConfig,
};
