use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a mesh message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Fire-and-forget delivery.
    Deliver,
    /// Request-style message whose sender awaits a matching reply.
    Ask,
    /// Reply to a previous ask; never enqueued, consumed by the ask registry.
    Reply,
}

impl MessageType {
    /// Stable wire token, also used as the MAC tuple field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Deliver => "deliver",
            MessageType::Ask => "ask",
            MessageType::Reply => "reply",
        }
    }
}

/// A signed message on the wire between two agents.
///
/// The `mac` authenticates the `(id, type, payload, timestamp, nonce)` tuple
/// under the mesh transport secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshMessage {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub payload: String,
    /// Required when `kind == Reply`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub nonce: Uuid,
    /// 64-char lowercase hex HMAC-SHA-256.
    pub mac: String,
}

/// A message after acceptance, as held in an agent's queue.
///
/// Replies never appear here; they are consumed by the ask registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub id: Uuid,
    pub from: String,
    pub payload: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
}

impl IncomingMessage {
    pub fn from_wire(msg: &MeshMessage) -> Self {
        Self {
            id: msg.id,
            from: msg.from.clone(),
            payload: msg.payload.clone(),
            timestamp: msg.timestamp,
            kind: msg.kind,
            reply_to: msg.reply_to,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}
