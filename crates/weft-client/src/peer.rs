//! Outbound requester for the message surface.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use weft_core::{MeshMessage, MessageType, WeftError, epoch_millis};
use weft_crypto::{encode_transport_secret, message_mac};

/// Hard client-side deadline for health probes.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("peer answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Shape(String),
    #[error(transparent)]
    Core(#[from] WeftError),
}

impl From<ClientError> for WeftError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(e) => WeftError::Dependency(format!("peer unreachable: {e}")),
            ClientError::Status { status, body } => {
                WeftError::Protocol(format!("peer answered {status}: {body}"))
            }
            ClientError::Shape(e) => WeftError::Protocol(e),
            ClientError::Core(e) => e,
        }
    }
}

/// Builds signed mesh messages and delivers them to peers.
pub struct PeerClient {
    http: reqwest::Client,
    agent: String,
    secret: Vec<u8>,
    bearer: String,
}

impl PeerClient {
    pub fn new(agent: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            http: reqwest::Client::new(),
            agent: agent.into(),
            bearer: encode_transport_secret(&secret),
            secret,
        }
    }

    /// Assemble one message with a fresh id, fresh nonce, current timestamp,
    /// and the MAC over the signed tuple.
    pub fn build_message(
        &self,
        to: &str,
        kind: MessageType,
        payload: &str,
        reply_to: Option<Uuid>,
    ) -> MeshMessage {
        let mut message = MeshMessage {
            id: Uuid::new_v4(),
            from: self.agent.clone(),
            to: to.to_string(),
            kind,
            payload: payload.to_string(),
            reply_to,
            timestamp: epoch_millis(),
            nonce: Uuid::new_v4(),
            mac: String::new(),
        };
        message.mac = message_mac(&self.secret, &message);
        message
    }

    /// Fire-and-forget delivery. Returns the message id.
    pub async fn deliver(
        &self,
        peer_url: &str,
        to: &str,
        payload: &str,
    ) -> Result<Uuid, ClientError> {
        let message = self.build_message(to, MessageType::Deliver, payload, None);
        self.post_message(peer_url, "/mesh/msg", &message).await?;
        debug!(to, id = %message.id, "message delivered");
        Ok(message.id)
    }

    /// Initiate an ask on the receiver. Returns the message id; the caller
    /// registers it in its own ask registry and awaits the reply.
    pub async fn ask(&self, peer_url: &str, to: &str, payload: &str) -> Result<Uuid, ClientError> {
        let message = self.build_message(to, MessageType::Ask, payload, None);
        self.post_message(peer_url, "/mesh/ask", &message).await?;
        debug!(to, id = %message.id, "ask sent");
        Ok(message.id)
    }

    /// Deliver a reply back to the original asker. Returns whether the asker
    /// still had the ask pending.
    pub async fn reply(
        &self,
        peer_url: &str,
        to: &str,
        reply_to: Uuid,
        payload: &str,
    ) -> Result<bool, ClientError> {
        let message = self.build_message(to, MessageType::Reply, payload, Some(reply_to));
        let value = self.post_message(peer_url, "/mesh/response", &message).await?;
        Ok(value["resolved"].as_bool().unwrap_or(false))
    }

    /// Probe a peer's health endpoint. Any failure (connect error, non-2xx,
    /// deadline) reads as offline, never as an error.
    pub async fn is_online(&self, peer_url: &str) -> bool {
        let url = format!("{peer_url}/mesh/health");
        match self.http.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn post_message(
        &self,
        peer_url: &str,
        path: &str,
        message: &MeshMessage,
    ) -> Result<serde_json::Value, ClientError> {
        let url = format!("{peer_url}{path}");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer)
            .json(message)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Shape(e.to_string()))
    }
}
