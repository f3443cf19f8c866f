//! # weft-core
//!
//! Core types, errors, and primitives for the Weft agent mesh.
//! This crate defines the shared vocabulary used by every other crate in the
//! workspace: the wire message model, the unified error taxonomy, canonical
//! JSON encoding for signing, and peer URL normalization.

pub mod canonical;
pub mod error;
pub mod message;
pub mod url;

pub use canonical::{canonical_bytes, canonical_string};
pub use error::{Result, WeftError};
pub use message::{IncomingMessage, MeshMessage, MessageType, epoch_millis};
pub use url::normalize_peer_url;
