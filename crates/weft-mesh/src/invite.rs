//! Invite issuance.

use ed25519_dalek::SigningKey;
use uuid::Uuid;

use weft_core::{Result, epoch_millis};
use weft_crypto::invite::{INVITE_SCHEMA_VERSION, InvitePayload};
use weft_crypto::encode_invite;

pub const DEFAULT_INVITE_TTL_SECS: u64 = 900;

/// Hard cap on invite lifetime.
pub const MAX_INVITE_TTL_SECS: u64 = 3600;

/// Build and sign an invite for one agent bound to one host public key.
///
/// `ttl_secs` is clamped to [`MAX_INVITE_TTL_SECS`].
pub fn issue_invite(
    root_key: &SigningKey,
    mesh: &str,
    agent: &str,
    node_pub_key: &str,
    ttl_secs: u64,
    min_manifest_version: Option<u64>,
    seed_hints: Vec<String>,
) -> Result<String> {
    let ttl_secs = ttl_secs.min(MAX_INVITE_TTL_SECS);
    let now = epoch_millis();
    let payload = InvitePayload {
        schema_version: INVITE_SCHEMA_VERSION,
        mesh: mesh.to_string(),
        agent: agent.to_string(),
        node_pub_key: node_pub_key.to_string(),
        jti: Uuid::new_v4(),
        iat: now,
        nbf: now,
        exp: now + (ttl_secs * 1000) as i64,
        min_manifest_version,
        seed_hints,
    };
    encode_invite(root_key, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_crypto::{decode_invite, generate_signing_key};

    #[test]
    fn issued_invite_decodes_with_expected_fields() {
        let key = generate_signing_key();
        let token = issue_invite(
            &key,
            "prod",
            "qa",
            "cHVi",
            DEFAULT_INVITE_TTL_SECS,
            Some(3),
            vec!["http://seed:4700".into()],
        )
        .unwrap();

        let payload = decode_invite(&key.verifying_key(), &token).unwrap();
        assert_eq!(payload.mesh, "prod");
        assert_eq!(payload.agent, "qa");
        assert_eq!(payload.node_pub_key, "cHVi");
        assert_eq!(payload.min_manifest_version, Some(3));
        assert_eq!(payload.exp - payload.nbf, 900_000);
        assert!(payload.in_validity_window(epoch_millis()));
    }

    #[test]
    fn ttl_is_capped_at_one_hour() {
        let key = generate_signing_key();
        let token =
            issue_invite(&key, "prod", "qa", "cHVi", 86_400, None, vec![]).unwrap();
        let payload = decode_invite(&key.verifying_key(), &token).unwrap();
        assert_eq!(payload.exp - payload.nbf, (MAX_INVITE_TTL_SECS * 1000) as i64);
    }

    #[test]
    fn each_invite_gets_a_fresh_jti() {
        let key = generate_signing_key();
        let a = issue_invite(&key, "m", "a", "k", 900, None, vec![]).unwrap();
        let b = issue_invite(&key, "m", "a", "k", 900, None, vec![]).unwrap();
        let pa = decode_invite(&key.verifying_key(), &a).unwrap();
        let pb = decode_invite(&key.verifying_key(), &b).unwrap();
        assert_ne!(pa.jti, pb.jti);
    }
}
