//! # weft-agent
//!
//! The per-agent runtime: the bounded-window nonce cache, the persisted
//! incoming-message queue, the pending-ask registry, and the daemon loop
//! that drains the queue into an external batch processor.
//!
//! All shared state lives behind explicit owners; HTTP handlers and timer
//! tasks mutate it only through the methods exposed here.

pub mod ask;
pub mod daemon;
pub mod nonce;
pub mod queue;
pub mod runtime;

pub use ask::{AskRegistry, AskTicket};
pub use daemon::{BatchProcessor, LoggingProcessor, PidFile, run_poll_loop, stop_daemon};
pub use nonce::NonceCache;
pub use queue::MessageQueue;
pub use runtime::{AgentContext, MessageObserver, auto_register, spawn_signal_handler};
