use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{error, info};

const SCRATCH_PREFIX: &str = "tubegrab-";

/// Request-scoped staging directory. Removed exactly once: on an explicit
/// [`ScratchDir::cleanup`] or when the guard is dropped, whichever comes first.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn create_in(root: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        info!("Created temporary directory: {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory and everything in it. Never fails; problems are
    /// logged.
    pub fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        if !dir.path().exists() {
            info!(
                "Cleanup: temp dir '{}' already gone",
                self.path.display()
            );
            return;
        }

        // Blocking: the directory must be gone once the guard is dropped.
        match dir.close() {
            Ok(()) => info!("Cleanup: removed temp dir {}", self.path.display()),
            Err(e) => error!(
                "Error during cleanup of temp dir {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.cleanup();
    }
}
