//! # weft-client
//!
//! The outbound half of the mesh: a peer client that constructs signed
//! messages and POSTs them with bearer auth, the bootstrap join client, and
//! the manifest sync poller that keeps an enrolled host current.

pub mod bootstrap;
pub mod peer;
pub mod sync;

pub use bootstrap::{JoinResponse, SyncBlock, join};
pub use peer::{ClientError, HEALTH_TIMEOUT, PeerClient};
pub use sync::{HeadInfo, ManifestSync, adopt_manifest};
