//! Peer URL normalization.

use crate::{Result, WeftError};

/// Normalize a peer base URL to `scheme://host:port` form.
///
/// - Empty input is rejected.
/// - A bare `host:port` gets `http://` prepended.
/// - A single trailing slash is stripped.
/// - Only `http` and `https` schemes are accepted.
pub fn normalize_peer_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WeftError::Protocol("peer URL is empty".into()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    if !with_scheme.starts_with("http://") && !with_scheme.starts_with("https://") {
        return Err(WeftError::Protocol(format!(
            "unsupported scheme in peer URL '{trimmed}'"
        )));
    }

    let normalized = with_scheme
        .strip_suffix('/')
        .unwrap_or(&with_scheme)
        .to_string();
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(normalize_peer_url("").is_err());
        assert!(normalize_peer_url("   ").is_err());
    }

    #[test]
    fn prepends_http_for_bare_host_port() {
        assert_eq!(
            normalize_peer_url("10.0.0.5:4700").unwrap(),
            "http://10.0.0.5:4700"
        );
    }

    #[test]
    fn strips_single_trailing_slash() {
        assert_eq!(
            normalize_peer_url("https://mesh.example:443/").unwrap(),
            "https://mesh.example:443"
        );
    }

    #[test]
    fn keeps_existing_scheme() {
        assert_eq!(
            normalize_peer_url("https://host:8443").unwrap(),
            "https://host:8443"
        );
        assert_eq!(
            normalize_peer_url("http://host:80").unwrap(),
            "http://host:80"
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(normalize_peer_url("ftp://host:21").is_err());
        assert!(normalize_peer_url("unix:///tmp/sock").is_err());
    }
}
