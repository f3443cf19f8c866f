use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::warn;

use weft_agent::{
    AgentContext, LoggingProcessor, PidFile, auto_register, run_poll_loop, spawn_signal_handler,
    stop_daemon,
};
use weft_client::{ManifestSync, PeerClient};
use weft_config::{StatePaths, load_config};
use weft_core::Result;

/// Start the agent: bind the listener, register ourselves in the local peer
/// map, then serve until a termination signal arrives. With `--daemon`, also
/// record a PID file, run the queue poll loop, and follow manifest updates.
pub(super) async fn cmd_start(paths: StatePaths, agent: String, daemon: bool) -> Result<()> {
    let config = load_config(&paths)?;
    let ctx = Arc::new(AgentContext::load(&paths, &agent)?);

    let listener =
        tokio::net::TcpListener::bind((config.listener.host.as_str(), config.listener.port))
            .await?;
    let addr = listener.local_addr()?;

    if config.daemon.auto_register {
        auto_register(&paths, &agent, &config.listener.host, addr.port())?;
    }

    let shutdown = Arc::new(Notify::new());
    spawn_signal_handler(shutdown.clone());

    let _pid = if daemon {
        Some(PidFile::create(paths.pid_file())?)
    } else {
        None
    };

    let poll_handle = daemon.then(|| {
        tokio::spawn(run_poll_loop(
            ctx.clone(),
            Arc::new(LoggingProcessor),
            Duration::from_secs(config.daemon.poll_interval_secs),
            shutdown.clone(),
        ))
    });

    // Follow manifest updates via any peer that is not ourselves.
    let sync_handle = config
        .peers
        .iter()
        .find(|(name, _)| name.as_str() != agent)
        .map(|(_, peer)| {
            let sync = ManifestSync::new(
                paths.clone(),
                peer.url.clone(),
                ctx.secret_b64.clone(),
                Duration::from_secs(config.daemon.sync_interval_secs),
            );
            tokio::spawn(sync.run(shutdown.clone()))
        });

    println!("weft agent '{agent}' on mesh '{}' listening at {addr}", ctx.mesh);
    let served = weft_server::serve(ctx.clone(), listener, shutdown.clone()).await;

    // Listener is down; reject everything still pending and stop the loops.
    ctx.shutdown();
    shutdown.notify_waiters();
    if let Some(handle) = poll_handle {
        let _ = handle.await;
    }
    if let Some(handle) = sync_handle {
        let _ = handle.await;
    }
    served
}

pub(super) async fn cmd_stop(paths: &StatePaths, grace: u64) -> Result<()> {
    if stop_daemon(&paths.pid_file(), Duration::from_secs(grace)).await? {
        println!("daemon stopped");
    } else {
        println!("no daemon running for mesh '{}'", paths.mesh());
    }
    Ok(())
}

pub(super) async fn cmd_status(paths: &StatePaths) -> Result<()> {
    let running = PidFile::is_running(paths.pid_file());
    println!(
        "mesh '{}': daemon {}",
        paths.mesh(),
        if running { "running" } else { "stopped" }
    );

    match load_config(paths) {
        Ok(config) => {
            let secret = weft_crypto::load_transport_secret(&paths.mesh_key())?;
            let client = PeerClient::new("status-probe", secret);
            for (name, peer) in &config.peers {
                let online = client.is_online(&peer.url).await;
                println!(
                    "  {:<16} {:<32} {}",
                    name,
                    peer.url,
                    if online { "online" } else { "offline" }
                );
            }
        }
        Err(e) => warn!(error = %e, "mesh state not readable"),
    }
    Ok(())
}
