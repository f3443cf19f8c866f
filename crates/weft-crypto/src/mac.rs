//! Shared-secret message authentication.
//!
//! The MAC covers the `(id, type, payload, timestamp, nonce)` tuple joined
//! with `|`, keyed with HMAC-SHA-256, rendered as 64 lowercase hex chars.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use weft_core::MeshMessage;

type HmacSha256 = Hmac<Sha256>;

pub const MAC_DELIMITER: char = '|';

/// Compute the MAC for one message tuple.
pub fn sign_mac(
    secret: &[u8],
    id: &str,
    kind: &str,
    payload: &str,
    timestamp: i64,
    nonce: &str,
) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take a key of any size");
    mac.update(id.as_bytes());
    mac.update(&[MAC_DELIMITER as u8]);
    mac.update(kind.as_bytes());
    mac.update(&[MAC_DELIMITER as u8]);
    mac.update(payload.as_bytes());
    mac.update(&[MAC_DELIMITER as u8]);
    mac.update(timestamp.to_string().as_bytes());
    mac.update(&[MAC_DELIMITER as u8]);
    mac.update(nonce.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a MAC in constant time. Unequal lengths fail immediately without
/// a data-dependent comparison.
pub fn verify_mac(
    secret: &[u8],
    id: &str,
    kind: &str,
    payload: &str,
    timestamp: i64,
    nonce: &str,
    provided: &str,
) -> bool {
    let expected = sign_mac(secret, id, kind, payload, timestamp, nonce);
    expected.len() == provided.len()
        && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

/// Compute the MAC for a wire message from its own fields.
pub fn message_mac(secret: &[u8], msg: &MeshMessage) -> String {
    sign_mac(
        secret,
        &msg.id.to_string(),
        msg.kind.as_str(),
        &msg.payload,
        msg.timestamp,
        &msg.nonce.to_string(),
    )
}

/// Verify the MAC carried by a wire message.
pub fn verify_message(secret: &[u8], msg: &MeshMessage) -> bool {
    verify_mac(
        secret,
        &msg.id.to_string(),
        msg.kind.as_str(),
        &msg.payload,
        msg.timestamp,
        &msg.nonce.to_string(),
        &msg.mac,
    )
}
