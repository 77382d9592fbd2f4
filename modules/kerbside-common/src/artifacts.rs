//! Per-request scratch files with guaranteed cleanup.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;
use uuid::Uuid;

/// Tracks every temporary file created while serving one request.
///
/// Files live in a private scratch directory and carry uuid names, so two
/// concurrent requests can never collide. [`ArtifactSet::cleanup`] removes
/// the registered files and the directory on every exit path; the inner
/// [`TempDir`] drop is the backstop if a path forgets to call it. Removal
/// failures are logged and never override the request outcome.
pub struct ArtifactSet {
    root: TempDir,
    registered: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn create() -> std::io::Result<Self> {
        let root = tempfile::Builder::new().prefix("kerbside-").tempdir()?;
        Ok(Self {
            root,
            registered: Vec::new(),
        })
    }

    /// Reserve a uniquely named path with the given suffix inside the scratch
    /// directory and track it for cleanup. The file itself is not created.
    pub fn register(&mut self, suffix: &str) -> PathBuf {
        let path = self.root.path().join(format!("{}{suffix}", Uuid::new_v4()));
        self.registered.push(path.clone());
        path
    }

    /// Paths handed out so far, whether or not a file was written to them.
    pub fn registered(&self) -> &[PathBuf] {
        &self.registered
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Remove every registered file and the scratch directory itself.
    pub fn cleanup(self) {
        for path in &self.registered {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                }
            }
        }
        if let Err(e) = self.root.close() {
            warn!(error = %e, "Failed to remove scratch directory");
        }
    }
}
