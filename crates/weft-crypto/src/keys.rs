//! Key material generation and persistence.
//!
//! Private keys (root, node) are PKCS#8 PEM with mode `600`; the transport
//! secret is 32 random bytes stored base64, also mode `600`. Public keys are
//! SPKI PEM.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;

use weft_core::{Result, WeftError};

pub const TRANSPORT_SECRET_LEN: usize = 32;

/// Generate a fresh Ed25519 signing key.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Persist a private key as PKCS#8 PEM with restricted mode.
pub fn save_signing_key(path: &Path, key: &SigningKey) -> Result<()> {
    let pem = key
        .to_pkcs8_pem(Default::default())
        .map_err(|e| WeftError::Verification(format!("encode private key: {e}")))?;
    write_restricted(path, pem.as_bytes())
}

pub fn load_signing_key(path: &Path) -> Result<SigningKey> {
    let pem = fs::read_to_string(path)?;
    SigningKey::from_pkcs8_pem(&pem).map_err(|e| {
        WeftError::Verification(format!("invalid private key {}: {e}", path.display()))
    })
}

/// Persist a public key as SPKI PEM (world-readable).
pub fn save_verifying_key(path: &Path, key: &VerifyingKey) -> Result<()> {
    let pem = key
        .to_public_key_pem(Default::default())
        .map_err(|e| WeftError::Verification(format!("encode public key: {e}")))?;
    fs::write(path, pem.as_bytes())?;
    Ok(())
}

pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey> {
    let pem = fs::read_to_string(path)?;
    VerifyingKey::from_public_key_pem(&pem).map_err(|e| {
        WeftError::Verification(format!("invalid public key {}: {e}", path.display()))
    })
}

/// Raw base64 of a public key, as carried in invite tokens and join requests.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    BASE64.encode(key.as_bytes())
}

/// Base64 form of the transport secret, as embedded in manifests and used as
/// the bearer token.
pub fn encode_transport_secret(secret: &[u8]) -> String {
    BASE64.encode(secret)
}

/// Generate a fresh 32-byte transport secret.
pub fn generate_transport_secret() -> [u8; TRANSPORT_SECRET_LEN] {
    let mut secret = [0u8; TRANSPORT_SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    secret
}

/// Persist the transport secret base64-encoded with restricted mode.
pub fn save_transport_secret(path: &Path, secret: &[u8]) -> Result<()> {
    let mut encoded = BASE64.encode(secret);
    encoded.push('\n');
    write_restricted(path, encoded.as_bytes())
}

pub fn load_transport_secret(path: &Path) -> Result<Vec<u8>> {
    let encoded = fs::read_to_string(path)?;
    let secret = BASE64
        .decode(encoded.trim())
        .map_err(|e| WeftError::Verification(format!("invalid mesh key {}: {e}", path.display())))?;
    if secret.len() != TRANSPORT_SECRET_LEN {
        return Err(WeftError::Verification(format!(
            "mesh key {} must be {TRANSPORT_SECRET_LEN} bytes, got {}",
            path.display(),
            secret.len()
        )));
    }
    Ok(secret)
}

fn write_restricted(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
