//! # weft-mesh
//!
//! Mesh trust state: the versioned signed manifest, invite issuance, and the
//! invite-consumption predicate used by the bootstrap surface.
//!
//! The manifest is the unit of distribution for transport secrets and the
//! peer roster. It is signed by the offline root key; agents verify it
//! against the pinned `root.pub` and never adopt a version that regresses.

pub mod consume;
pub mod init;
pub mod invite;
pub mod manifest;

pub use consume::{ConsumptionStore, MemoryConsumption};
pub use init::init_mesh;
pub use invite::{DEFAULT_INVITE_TTL_SECS, MAX_INVITE_TTL_SECS, issue_invite};
pub use manifest::{
    MANIFEST_SCHEMA_VERSION, ManifestPayload, ManifestSecurity, ManifestStore, ManifestTransport,
    Revocations, build_payload, derive_kid, manifest_hash, update_manifest,
};
