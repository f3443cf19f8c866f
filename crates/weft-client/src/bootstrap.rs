//! Join client for new hosts.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use weft_crypto::SignedEnvelope;

use crate::peer::ClientError;

/// What the seed returns on a successful join.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub ok: bool,
    pub mesh: String,
    pub agent: String,
    pub now: i64,
    pub manifest: SignedEnvelope,
    pub sync: SyncBlock,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBlock {
    pub head_url: String,
    pub manifest_url_template: String,
    pub interval_seconds: u64,
}

/// Present an invite to a seed's bootstrap surface.
///
/// The invite token is the credential; no bearer auth is sent. The caller
/// verifies the returned envelope against the pinned root key before
/// adopting anything from it.
pub async fn join(
    seed_url: &str,
    token: &str,
    node_pub_key: &str,
) -> Result<JoinResponse, ClientError> {
    let http = reqwest::Client::new();
    let resp = http
        .post(format!("{seed_url}/mesh/bootstrap/join"))
        .json(&json!({ "token": token, "nodePubKey": node_pub_key }))
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status { status: status.as_u16(), body });
    }
    let response: JoinResponse =
        serde_json::from_str(&body).map_err(|e| ClientError::Shape(e.to_string()))?;
    info!(mesh = %response.mesh, agent = %response.agent, "join accepted by seed");
    Ok(response)
}
