//! # weft-crypto
//!
//! The cryptographic primitives of the Weft mesh:
//!
//! - Shared-secret HMAC authentication of individual messages
//! - Ed25519 envelope signing over canonical JSON payloads
//! - Short-lived signed invite tokens
//! - Key material generation and on-disk persistence
//!
//! All secret comparisons go through `subtle::ConstantTimeEq`.

pub mod envelope;
pub mod invite;
pub mod keys;
pub mod mac;

pub use envelope::{ENVELOPE_ALG, SignedEnvelope, VerifyError, sign_envelope, verify_envelope};
pub use invite::{
    INVITE_CLOCK_SKEW_MS, InviteError, InvitePayload, decode_invite, encode_invite,
};
pub use keys::{
    TRANSPORT_SECRET_LEN, encode_public_key, encode_transport_secret, generate_signing_key,
    generate_transport_secret, load_signing_key, load_transport_secret, load_verifying_key,
    save_signing_key, save_transport_secret, save_verifying_key,
};
pub use mac::{message_mac, sign_mac, verify_mac, verify_message};
