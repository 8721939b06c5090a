use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

/// Temporary staging directory for one chapter or volume job
///
/// The directory is created on [`Workspace::create`] and removed either by
/// [`Workspace::close`] on the normal path or when the guard is dropped (early return,
/// error, panic unwinding). Existing contents are kept on creation so that a job interrupted
/// earlier resumes from the pages it already has.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Create (or reuse) the directory at `path`
    pub async fn create(path: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&path).await?;
        debug!(workspace = ?path, "workspace ready");
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Directory the job writes into
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it
    pub async fn close(mut self) {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(workspace = ?self.path, "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(workspace = ?self.path, error = %e, "failed to remove workspace"),
        }
        self.removed = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(workspace = ?self.path, "workspace removed on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(workspace = ?self.path, error = %e, "failed to remove workspace"),
        }
    }
}
