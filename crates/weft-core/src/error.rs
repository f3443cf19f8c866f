use thiserror::Error;

/// Unified error type for the Weft mesh core.
///
/// Variants are grouped by concern; the HTTP edge maps each group to a status
/// code, and the CLI maps any error to a non-zero exit.
#[derive(Error, Debug)]
pub enum WeftError {
    // ── Protocol / format ──────────────────────────────────────
    #[error("protocol error: {0}")]
    Protocol(String),

    // ── Auth ───────────────────────────────────────────────────
    #[error("authentication failed: {0}")]
    Auth(String),

    // ── Authorization ──────────────────────────────────────────
    #[error("forbidden: {0}")]
    Forbidden(String),

    // ── Destination ────────────────────────────────────────────
    #[error("not found: {0}")]
    NotFound(String),

    // ── Conflict ───────────────────────────────────────────────
    #[error("conflict: {0}")]
    Conflict(String),

    // ── Size ───────────────────────────────────────────────────
    #[error("message too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    // ── Precondition ───────────────────────────────────────────
    #[error("precondition failed: {0}")]
    Precondition(String),

    // ── Dependency ─────────────────────────────────────────────
    #[error("dependency unavailable: {0}")]
    Dependency(String),

    // ── Cryptographic verification ─────────────────────────────
    #[error("verification failed: {0}")]
    Verification(String),

    // ── Lifecycle ──────────────────────────────────────────────
    #[error("ask timed out")]
    AskTimedOut,

    #[error("agent stopped")]
    AgentStopped,

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WeftError>;
