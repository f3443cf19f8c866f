use clap::{Parser, Subcommand};
use std::path::PathBuf;

use weft_config::StatePaths;

mod init;
mod message;
mod start;
mod trust;

/// Weft: authenticated peer-to-peer message mesh for named agents
#[derive(Parser)]
#[command(name = "weft", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Mesh name (directory under the state root)
    #[arg(short, long, global = true, default_value = "default")]
    mesh: String,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new mesh: transport secret, root keypair, signed manifest v1
    Init {
        /// Listener host for agents of this mesh
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Listener port (0 = OS-assigned)
        #[arg(long, default_value = "0")]
        port: u16,
    },
    /// Run an agent listener, optionally with the autonomous daemon loop
    Start {
        /// Agent name to run as
        agent: String,
        /// Drain the queue on a poll loop and record a PID file
        #[arg(long)]
        daemon: bool,
    },
    /// Stop a running daemon (SIGTERM, then SIGKILL after the grace period)
    Stop {
        /// Seconds to wait before force-killing
        #[arg(long, default_value = "10")]
        grace: u64,
    },
    /// Show daemon state and peer reachability
    Status,
    /// Issue an invite token for a new agent (requires the root key)
    Invite {
        /// Agent name the joining host will assume
        agent: String,
        /// base64 public key of the joining host
        #[arg(long)]
        node_pub_key: String,
        /// Token lifetime in seconds (capped at one hour)
        #[arg(long, default_value = "900")]
        ttl: u64,
        /// Require seeds to serve at least this manifest version
        #[arg(long)]
        min_manifest_version: Option<u64>,
    },
    /// Join a mesh with an invite token
    Join {
        /// Base URL of a seed agent, e.g. http://host:4700
        seed: String,
        /// Invite token
        token: String,
        /// Path to the mesh root public key (PEM) to pin
        #[arg(long)]
        root_pub: PathBuf,
    },
    /// Send a fire-and-forget message to a peer agent
    Send {
        /// Our agent name
        #[arg(long)]
        from: String,
        /// Receiving agent name
        to: String,
        /// Message payload
        payload: String,
    },
    /// Ask a peer agent and block until the reply or the deadline
    Ask {
        /// Our agent name
        #[arg(long)]
        from: String,
        /// Receiving agent name
        to: String,
        /// Question payload
        payload: String,
        /// Seconds to wait for the reply
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// List peers and probe their health endpoints
    Peers,
}

impl Cli {
    pub async fn run(self) -> weft_core::Result<()> {
        init_tracing(self.log_level.as_deref());
        let paths = StatePaths::resolve(&self.mesh);

        match self.command {
            Commands::Init { host, port } => init::cmd_init(&paths, host, port),
            Commands::Start { agent, daemon } => start::cmd_start(paths, agent, daemon).await,
            Commands::Stop { grace } => start::cmd_stop(&paths, grace).await,
            Commands::Status => start::cmd_status(&paths).await,
            Commands::Invite { agent, node_pub_key, ttl, min_manifest_version } => {
                trust::cmd_invite(&paths, agent, node_pub_key, ttl, min_manifest_version)
            }
            Commands::Join { seed, token, root_pub } => {
                trust::cmd_join(seed, token, root_pub).await
            }
            Commands::Send { from, to, payload } => {
                message::cmd_send(&paths, from, to, payload).await
            }
            Commands::Ask { from, to, payload, timeout } => {
                message::cmd_ask(paths, from, to, payload, timeout).await
            }
            Commands::Peers => message::cmd_peers(&paths).await,
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let directive = level
        .map(str::to_string)
        .or_else(|| std::env::var("WEFT_LOG").ok())
        .unwrap_or_else(|| "info".into());
    let filter = tracing_subscriber::EnvFilter::new(directive);
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
