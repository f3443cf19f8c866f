//! Bootstrap surface: join, head, and manifest fetch.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use weft_agent::AgentContext;
use weft_core::epoch_millis;
use weft_crypto::{InviteError, SignedEnvelope, decode_invite};
use weft_mesh::manifest_hash;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub token: String,
    /// base64 of the joining host's enrollment public key.
    pub node_pub_key: String,
}

/// `POST /mesh/bootstrap/join`: unauthenticated; the invite token is the
/// credential.
pub async fn join_handler(
    State(ctx): State<Arc<AgentContext>>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<Value>, ApiError> {
    let root_pub = ctx.root_pub.as_ref().ok_or_else(|| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "trust root not available")
    })?;

    let invite = decode_invite(root_pub, &request.token).map_err(|e| match e {
        InviteError::Signature => {
            warn!(agent = %ctx.agent, "join rejected: invite signature invalid");
            ApiError::new(StatusCode::UNAUTHORIZED, e.to_string())
        }
        InviteError::Malformed | InviteError::Shape(_) => {
            ApiError::new(StatusCode::BAD_REQUEST, e.to_string())
        }
    })?;

    if invite.mesh != ctx.mesh {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "invite is for a different mesh"));
    }
    if invite.node_pub_key != request.node_pub_key {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "invite is bound to a different node key",
        ));
    }
    let now = epoch_millis();
    if !invite.in_validity_window(now) {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "invite expired or not yet valid",
        ));
    }

    let (envelope, payload) = ctx
        .manifest
        .current()?
        .ok_or_else(|| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "manifest not available"))?;

    if payload.revocations.invite_jti.contains(&invite.jti) {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "invite has been revoked"));
    }
    if payload.revocations.agents.contains(&invite.agent) {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "agent has been revoked"));
    }

    if let Some(min) = invite.min_manifest_version {
        if payload.version < min {
            return Err(ApiError::new(
                StatusCode::PRECONDITION_FAILED,
                format!("local manifest v{} is older than required v{min}", payload.version),
            ));
        }
    }

    if let Some(consumption) = &ctx.consumption {
        if !consumption.consume(&invite.jti) {
            return Err(ApiError::new(StatusCode::CONFLICT, "invite already consumed"));
        }
    }

    info!(agent = %invite.agent, mesh = %ctx.mesh, "bootstrap join accepted");
    Ok(Json(json!({
        "ok": true,
        "mesh": ctx.mesh,
        "agent": invite.agent,
        "now": now,
        "manifest": envelope,
        "sync": {
            "headUrl": "/mesh/bootstrap/head",
            "manifestUrlTemplate": "/mesh/bootstrap/manifest/{version}",
            "intervalSeconds": ctx.sync_interval_secs,
        },
    })))
}

/// `GET /mesh/bootstrap/head`: authenticated summary of the current
/// manifest.
pub async fn head_handler(
    State(ctx): State<Arc<AgentContext>>,
) -> Result<Json<Value>, ApiError> {
    let (envelope, payload) = ctx
        .manifest
        .current()?
        .ok_or_else(|| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "manifest not available"))?;
    Ok(Json(json!({
        "mesh": payload.mesh,
        "version": payload.version,
        "manifestHash": manifest_hash(&envelope),
        "issuedAt": payload.issued_at,
    })))
}

/// `GET /mesh/bootstrap/manifest/{version}`: serves `latest` or the exact
/// current version; historical versions are not retained.
pub async fn manifest_handler(
    State(ctx): State<Arc<AgentContext>>,
    Path(version): Path<String>,
) -> Result<Json<SignedEnvelope>, ApiError> {
    let (envelope, payload) = ctx
        .manifest
        .current()?
        .ok_or_else(|| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "manifest not available"))?;

    if version == "latest" {
        return Ok(Json(envelope));
    }
    let requested: u64 = version
        .parse()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "invalid manifest version"))?;
    if requested == payload.version {
        Ok(Json(envelope))
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("manifest v{requested} is not retained"),
        ))
    }
}
