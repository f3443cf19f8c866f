//! # weft-server
//!
//! The HTTP surfaces of one agent: the authenticated message plane
//! (`/mesh/msg`, `/mesh/ask`, `/mesh/response`), the unauthenticated health
//! probe, and the bootstrap plane (`/mesh/bootstrap/*`).
//!
//! Every authenticated route goes through the bearer middleware; signed
//! message bodies additionally pass the validation chain in [`auth`].

pub mod auth;
pub mod bootstrap;
pub mod error;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tracing::{debug, info};

use weft_agent::AgentContext;
use weft_core::{MeshMessage, MessageType, epoch_millis};

pub use error::ApiError;

/// Build the axum router for one agent.
pub fn build_router(ctx: Arc<AgentContext>) -> Router {
    let protected = Router::new()
        .route("/mesh/msg", post(msg_handler))
        .route("/mesh/ask", post(ask_handler))
        .route("/mesh/response", post(response_handler))
        .route("/mesh/bootstrap/head", get(bootstrap::head_handler))
        .route(
            "/mesh/bootstrap/manifest/{version}",
            get(bootstrap::manifest_handler),
        )
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/mesh/health", get(health_handler))
        .route("/mesh/bootstrap/join", post(bootstrap::join_handler))
        .merge(protected)
        .with_state(ctx)
}

/// Serve the router until `shutdown` fires, then finish in-flight requests.
pub async fn serve(
    ctx: Arc<AgentContext>,
    listener: tokio::net::TcpListener,
    shutdown: Arc<Notify>,
) -> weft_core::Result<()> {
    let addr = listener.local_addr()?;
    info!(agent = %ctx.agent, %addr, "mesh listener started");
    let router = build_router(ctx);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await?;
    Ok(())
}

// ── Message surface ────────────────────────────────────────────

/// `POST /mesh/msg`: fire-and-forget delivery.
async fn msg_handler(
    State(ctx): State<Arc<AgentContext>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let message = auth::validate_signed_message(&ctx, &body)?;
    reject_wrong_recipient(&ctx, &message)?;

    let message = MeshMessage { kind: MessageType::Deliver, ..message };
    debug!(from = %message.from, id = %message.id, "message accepted");
    ctx.accept(&message);
    Ok(Json(json!({ "delivered": true, "messageId": message.id })))
}

/// `POST /mesh/ask`: request/reply initiation on the receiver side. Nothing
/// blocks here; the receiver answers later via `/mesh/response` on the
/// asker.
async fn ask_handler(
    State(ctx): State<Arc<AgentContext>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let message = auth::validate_signed_message(&ctx, &body)?;
    reject_wrong_recipient(&ctx, &message)?;

    let message = MeshMessage { kind: MessageType::Ask, ..message };
    debug!(from = %message.from, id = %message.id, "ask accepted");
    ctx.accept(&message);
    Ok(Json(json!({ "received": true, "messageId": message.id })))
}

/// `POST /mesh/response`: reply delivery back to the original asker. A late
/// reply is not an error; it answers 200 with `resolved: false`.
async fn response_handler(
    State(ctx): State<Arc<AgentContext>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let message = auth::validate_signed_message(&ctx, &body)?;
    let Some(reply_to) = message.reply_to else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "replyTo is required"));
    };

    let resolved = ctx.asks.resolve(reply_to, message.payload);
    debug!(%reply_to, resolved, "reply received");
    Ok(Json(json!({ "received": true, "resolved": resolved })))
}

/// `GET /mesh/health`: unauthenticated liveness.
async fn health_handler(State(ctx): State<Arc<AgentContext>>) -> Json<Value> {
    Json(json!({
        "agent": ctx.agent,
        "status": "online",
        "timestamp": epoch_millis(),
    }))
}

fn reject_wrong_recipient(ctx: &AgentContext, message: &MeshMessage) -> Result<(), ApiError> {
    if message.to != ctx.agent {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no agent '{}' at this host", message.to),
        ));
    }
    Ok(())
}
