//! State-root path resolution.

use std::path::{Path, PathBuf};

use weft_core::Result;

/// Resolved filesystem locations for one mesh.
///
/// Layout under the state root:
///
/// ```text
/// <root>/<mesh>/config.json      peer set, security parameters, listener
/// <root>/<mesh>/mesh.key         transport secret (base64, mode 600)
/// <root>/<mesh>/root.pub         pinned Ed25519 trust root (PEM)
/// <root>/<mesh>/manifest.json    latest signed envelope
/// <root>/<mesh>/node.pub|.key    host enrollment keypair
/// <root>/<mesh>/weft.pid         daemon PID file
/// <root>/<mesh>/queues/<agent>/queue.json
/// <admin_root>/<mesh>/root.key   root private key (mode 600)
/// ```
#[derive(Debug, Clone)]
pub struct StatePaths {
    root: PathBuf,
    admin_root: PathBuf,
    mesh: String,
}

impl StatePaths {
    /// Resolve from the environment: `WEFT_HOME` (default `~/.weft`) and
    /// `WEFT_ADMIN_HOME` (default `<root>/admin`).
    pub fn resolve(mesh: impl Into<String>) -> Self {
        let root = std::env::var("WEFT_HOME").map(PathBuf::from).unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".weft")
        });
        let admin_root = std::env::var("WEFT_ADMIN_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root.join("admin"));
        Self {
            root,
            admin_root,
            mesh: mesh.into(),
        }
    }

    /// Explicit roots, for tests and embedding.
    pub fn with_roots(
        root: impl Into<PathBuf>,
        admin_root: impl Into<PathBuf>,
        mesh: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            admin_root: admin_root.into(),
            mesh: mesh.into(),
        }
    }

    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    pub fn mesh_dir(&self) -> PathBuf {
        self.root.join(&self.mesh)
    }

    pub fn config_file(&self) -> PathBuf {
        self.mesh_dir().join("config.json")
    }

    pub fn mesh_key(&self) -> PathBuf {
        self.mesh_dir().join("mesh.key")
    }

    pub fn root_pub(&self) -> PathBuf {
        self.mesh_dir().join("root.pub")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.mesh_dir().join("manifest.json")
    }

    pub fn node_pub(&self) -> PathBuf {
        self.mesh_dir().join("node.pub")
    }

    pub fn node_key(&self) -> PathBuf {
        self.mesh_dir().join("node.key")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.mesh_dir().join("weft.pid")
    }

    pub fn queue_file(&self, agent: &str) -> PathBuf {
        self.mesh_dir().join("queues").join(agent).join("queue.json")
    }

    pub fn admin_mesh_dir(&self) -> PathBuf {
        self.admin_root.join(&self.mesh)
    }

    pub fn root_key(&self) -> PathBuf {
        self.admin_mesh_dir().join("root.key")
    }

    /// Create the mesh directory tree (not the admin side).
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.mesh_dir())?;
        Ok(())
    }

    /// Create the queue directory for one agent.
    pub fn ensure_queue_dir(&self, agent: &str) -> Result<()> {
        if let Some(parent) = self.queue_file(agent).parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Create the admin directory with restricted permissions.
    pub fn ensure_admin_dir(&self) -> Result<()> {
        let dir = self.admin_mesh_dir();
        std::fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }
}
