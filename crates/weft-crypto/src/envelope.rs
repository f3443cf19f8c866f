//! Asymmetric signing of canonical payloads.
//!
//! An envelope carries the canonical JSON bytes of a payload (base64url) and
//! a detached Ed25519 signature over exactly those bytes. Verification never
//! panics; every failure is a typed [`VerifyError`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use weft_core::canonical_bytes;

pub const ENVELOPE_ALG: &str = "Ed25519";

/// A signed envelope as it appears on the wire and on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub alg: String,
    /// Key identifier of the signing root, e.g. `root-2026-08-02`.
    pub kid: String,
    /// base64url of the canonical JSON payload bytes.
    pub payload: String,
    /// base64url of the detached signature.
    pub sig: String,
}

/// Typed verification failure.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("unsupported envelope algorithm '{0}'")]
    Algorithm(String),
    #[error("envelope field is not valid base64url: {0}")]
    Decode(String),
    #[error("envelope signature verification failed")]
    Signature,
    #[error("envelope payload is not valid JSON: {0}")]
    Payload(String),
}

/// Sign the canonical bytes of `payload` and wrap them in an envelope.
pub fn sign_envelope<T: Serialize>(
    key: &SigningKey,
    kid: &str,
    payload: &T,
) -> weft_core::Result<SignedEnvelope> {
    let bytes = canonical_bytes(payload)?;
    let sig = key.sign(&bytes);
    Ok(SignedEnvelope {
        alg: ENVELOPE_ALG.into(),
        kid: kid.into(),
        payload: URL_SAFE_NO_PAD.encode(&bytes),
        sig: URL_SAFE_NO_PAD.encode(sig.to_bytes()),
    })
}

/// Verify an envelope against a pinned public key, returning the decoded
/// payload on success.
pub fn verify_envelope(
    key: &VerifyingKey,
    envelope: &SignedEnvelope,
) -> Result<Value, VerifyError> {
    if envelope.alg != ENVELOPE_ALG {
        return Err(VerifyError::Algorithm(envelope.alg.clone()));
    }
    let payload = URL_SAFE_NO_PAD
        .decode(&envelope.payload)
        .map_err(|e| VerifyError::Decode(e.to_string()))?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(&envelope.sig)
        .map_err(|e| VerifyError::Decode(e.to_string()))?;
    let sig_arr: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| VerifyError::Decode("signature must be 64 bytes".into()))?;
    key.verify(&payload, &Signature::from_bytes(&sig_arr))
        .map_err(|_| VerifyError::Signature)?;
    serde_json::from_slice(&payload).map_err(|e| VerifyError::Payload(e.to_string()))
}
