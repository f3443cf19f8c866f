use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use weft_agent::{AgentContext, auto_register};
use weft_client::PeerClient;
use weft_config::{StatePaths, load_config};
use weft_core::{Result, WeftError};
use weft_crypto::load_transport_secret;

fn peer_url(paths: &StatePaths, to: &str) -> Result<String> {
    let config = load_config(paths)?;
    config
        .peers
        .get(to)
        .map(|p| p.url.clone())
        .ok_or_else(|| WeftError::NotFound(format!("no peer named '{to}' in mesh '{}'", paths.mesh())))
}

pub(super) async fn cmd_send(
    paths: &StatePaths,
    from: String,
    to: String,
    payload: String,
) -> Result<()> {
    let url = peer_url(paths, &to)?;
    let secret = load_transport_secret(&paths.mesh_key())?;
    let client = PeerClient::new(&from, secret);

    let id = client.deliver(&url, &to, &payload).await?;
    println!("delivered {id} to {to}");
    Ok(())
}

/// Ask a peer and block for the reply. The asker runs its own listener for
/// the duration so the peer can post the response back; this needs the
/// configured listener port to be free (stop the daemon first).
pub(super) async fn cmd_ask(
    paths: StatePaths,
    from: String,
    to: String,
    payload: String,
    timeout: u64,
) -> Result<()> {
    let config = load_config(&paths)?;
    let url = peer_url(&paths, &to)?;
    let ctx = Arc::new(AgentContext::load(&paths, &from)?);

    let listener =
        tokio::net::TcpListener::bind((config.listener.host.as_str(), config.listener.port))
            .await
            .map_err(|e| {
                WeftError::Dependency(format!(
                    "cannot bind listener (is the daemon running?): {e}"
                ))
            })?;
    let addr = listener.local_addr()?;
    if config.daemon.auto_register {
        auto_register(&paths, &from, &config.listener.host, addr.port())?;
    }

    let shutdown = Arc::new(Notify::new());
    let serve_handle = tokio::spawn(weft_server::serve(ctx.clone(), listener, shutdown.clone()));

    let client = PeerClient::new(&from, ctx.secret.clone());
    let ask_id = client.ask(&url, &to, &payload).await?;
    let ticket = ctx.asks.register(ask_id, Duration::from_secs(timeout));

    let outcome = ticket.wait().await;
    shutdown.notify_waiters();
    let _ = serve_handle.await;

    println!("{}", outcome?);
    Ok(())
}

pub(super) async fn cmd_peers(paths: &StatePaths) -> Result<()> {
    let config = load_config(paths)?;
    if config.peers.is_empty() {
        println!("no peers in mesh '{}'", paths.mesh());
        return Ok(());
    }
    let secret = load_transport_secret(&paths.mesh_key())?;
    let client = PeerClient::new("peer-probe", secret);
    for (name, peer) in &config.peers {
        let online = client.is_online(&peer.url).await;
        let description = peer.description.as_deref().unwrap_or("");
        println!(
            "{:<16} {:<32} {:<8} {}",
            name,
            peer.url,
            if online { "online" } else { "offline" },
            description
        );
    }
    Ok(())
}
