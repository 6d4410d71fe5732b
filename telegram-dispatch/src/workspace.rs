//! Per-dispatch temporary directory. Removed when dropped, so error paths clean up too.

use std::path::{Path, PathBuf};

use chrono::Local;
use dispatch_core::Result;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Owns every file produced for one dispatch.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    prefix: String,
    stamp: String,
}

impl Workspace {
    /// Creates a fresh directory under the system temp dir. `prefix` starts every generated name.
    pub fn create(prefix: &str) -> Result<Self> {
        Self::create_in(prefix, None)
    }

    /// Like [`Workspace::create`], but under `root` when given.
    pub fn create_in(prefix: &str, root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("media-dispatch-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let stamp = Local::now().format("%d-%m-%Y-%H-%M-%S").to_string();
        debug!(path = %dir.path().display(), "Workspace created");
        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            stamp,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `{prefix}_{timestamp}_{suffix}.{ext}` inside the workspace.
    pub fn media_path(&self, suffix: &str, ext: &str) -> PathBuf {
        self.dir.path().join(format!(
            "{}_{}_{}.{}",
            self.prefix,
            self.stamp,
            suffix,
            ext.trim_start_matches('.')
        ))
    }

    /// Path for a copied file, keeping its base name.
    pub fn copy_path(&self, file_name: &std::ffi::OsStr) -> PathBuf {
        self.dir.path().join(file_name)
    }

    /// Removes the directory now. Failures are logged, not returned; delivery already happened.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Workspace removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
        }
    }
}
