//! Per-request validation for the message surface.
//!
//! Two layers: a bearer middleware applied to every authenticated route, and
//! the body validation chain applied to signed messages: size cap, shape,
//! timestamp window, nonce uniqueness, then MAC, in that order.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tracing::warn;

use weft_agent::AgentContext;
use weft_core::{MeshMessage, epoch_millis};
use weft_crypto::verify_message;

use crate::error::ApiError;

/// Middleware: compare `Authorization: Bearer <token>` against the transport
/// secret in constant time.
pub async fn require_bearer(
    State(ctx): State<Arc<AgentContext>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token)
            if token.len() == ctx.secret_b64.len()
                && bool::from(token.as_bytes().ct_eq(ctx.secret_b64.as_bytes())) =>
        {
            Ok(next.run(request).await)
        }
        _ => {
            warn!(agent = %ctx.agent, "rejected request with missing or invalid bearer token");
            Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "missing or invalid bearer token",
            ))
        }
    }
}

/// Validate a signed message body. Callers have already passed the bearer
/// check.
pub fn validate_signed_message(ctx: &AgentContext, body: &[u8]) -> Result<MeshMessage, ApiError> {
    let limit = ctx.security.max_message_size_bytes;
    if body.len() > limit {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("message of {} bytes exceeds limit of {limit}", body.len()),
        ));
    }

    // Serde enforces presence of id, nonce, timestamp, and mac.
    let message: MeshMessage = serde_json::from_slice(body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid message body: {e}")))?;

    let now = epoch_millis();
    let window_ms = ctx.security.replay_window_seconds as i64 * 1000;
    if (now - message.timestamp).abs() > window_ms {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "message timestamp outside replay window",
        ));
    }

    if !ctx.nonces.check(message.nonce, now) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "replay detected: nonce already observed",
        ));
    }

    if !verify_message(&ctx.secret, &message) {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid message mac"));
    }

    Ok(message)
}
