//! Bounded-lifetime signed invite tokens.
//!
//! Wire form: `base64url(canonical JSON payload) . base64url(signature)`.
//! The signature is a detached Ed25519 signature over the payload bytes.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use weft_core::canonical_bytes;

pub const INVITE_SCHEMA_VERSION: u32 = 1;

/// Clock skew tolerated on both sides of `nbf`/`exp`.
pub const INVITE_CLOCK_SKEW_MS: i64 = 60_000;

/// The signed content of an invite token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePayload {
    pub schema_version: u32,
    pub mesh: String,
    /// Agent name the joining host will assume.
    pub agent: String,
    /// base64 of the host enrollment public key the token is bound to.
    pub node_pub_key: String,
    /// Unique token id; consumed at most once under strict mode.
    pub jti: Uuid,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_manifest_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed_hints: Vec<String>,
}

impl InvitePayload {
    /// Whether `now_ms` falls inside `[nbf, exp]` with the fixed skew.
    pub fn in_validity_window(&self, now_ms: i64) -> bool {
        now_ms + INVITE_CLOCK_SKEW_MS >= self.nbf && now_ms - INVITE_CLOCK_SKEW_MS <= self.exp
    }
}

/// Typed invite decode failure. Each case is distinguishable so the
/// bootstrap surface can answer with the right status.
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("malformed invite token")]
    Malformed,
    #[error("invite signature verification failed")]
    Signature,
    #[error("invalid invite payload: {0}")]
    Shape(String),
}

/// Canonicalize, sign, and encode an invite payload.
pub fn encode_invite(key: &SigningKey, payload: &InvitePayload) -> weft_core::Result<String> {
    let bytes = canonical_bytes(payload)?;
    let sig = key.sign(&bytes);
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&bytes),
        URL_SAFE_NO_PAD.encode(sig.to_bytes())
    ))
}

/// Decode and verify an invite token against the root public key.
pub fn decode_invite(key: &VerifyingKey, token: &str) -> Result<InvitePayload, InviteError> {
    let mut parts = token.split('.');
    let (payload_b64, sig_b64) = match (parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(s), None) => (p, s),
        _ => return Err(InviteError::Malformed),
    };
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| InviteError::Malformed)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| InviteError::Malformed)?;
    let sig_arr: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| InviteError::Malformed)?;
    key.verify(&payload, &Signature::from_bytes(&sig_arr))
        .map_err(|_| InviteError::Signature)?;
    serde_json::from_slice(&payload).map_err(|e| InviteError::Shape(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_signing_key;
    use weft_core::epoch_millis;

    fn payload(now: i64) -> InvitePayload {
        InvitePayload {
            schema_version: INVITE_SCHEMA_VERSION,
            mesh: "prod".into(),
            agent: "qa".into(),
            node_pub_key: "cHVia2V5".into(),
            jti: Uuid::new_v4(),
            iat: now,
            nbf: now,
            exp: now + 900_000,
            min_manifest_version: None,
            seed_hints: vec!["http://seed:4700".into()],
        }
    }

    #[test]
    fn encode_then_decode() {
        let key = generate_signing_key();
        let now = epoch_millis();
        let original = payload(now);
        let token = encode_invite(&key, &original).unwrap();
        assert_eq!(token.matches('.').count(), 1);

        let decoded = decode_invite(&key.verifying_key(), &token).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn wrong_key_is_signature_error() {
        let key = generate_signing_key();
        let other = generate_signing_key();
        let token = encode_invite(&key, &payload(epoch_millis())).unwrap();
        assert!(matches!(
            decode_invite(&other.verifying_key(), &token),
            Err(InviteError::Signature)
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let key = generate_signing_key();
        let vk = key.verifying_key();
        assert!(matches!(decode_invite(&vk, "no-dot"), Err(InviteError::Malformed)));
        assert!(matches!(decode_invite(&vk, "a.b.c"), Err(InviteError::Malformed)));
        assert!(matches!(decode_invite(&vk, "@@.@@"), Err(InviteError::Malformed)));
    }

    #[test]
    fn missing_field_is_shape_error() {
        let key = generate_signing_key();
        // Sign a payload that lacks the required `jti` field.
        let bytes =
            canonical_bytes(&serde_json::json!({"schemaVersion": 1, "mesh": "m"})).unwrap();
        let sig = key.sign(&bytes);
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&bytes),
            URL_SAFE_NO_PAD.encode(sig.to_bytes())
        );
        assert!(matches!(
            decode_invite(&key.verifying_key(), &token),
            Err(InviteError::Shape(_))
        ));
    }

    #[test]
    fn validity_window_includes_skew() {
        let now = epoch_millis();
        let p = payload(now);
        assert!(p.in_validity_window(now));
        assert!(p.in_validity_window(now - 59_000), "within nbf skew");
        assert!(p.in_validity_window(p.exp + 59_000), "within exp skew");
        assert!(!p.in_validity_window(now - 61_000));
        assert!(!p.in_validity_window(p.exp + 61_000));
    }
}
