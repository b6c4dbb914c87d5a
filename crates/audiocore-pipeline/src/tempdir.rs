//! RAII guard for the fallback path's per-job scratch directory.

use std::path::{Path, PathBuf};

use tracing::warn;

/// A per-job temp directory under `$TMPDIR/audiocore/{jobId}`, removed on
/// every exit path (success, failure, timeout, cancellation) by its `Drop`
/// implementation rather than at each individual return site.
pub struct TempJobDir {
    path: PathBuf,
}

impl TempJobDir {
    /// Create the directory, returning a guard that removes it on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(job_id: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join("audiocore").join(job_id);
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Borrow the directory's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempJobDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_dir_all(&self.path) {
                warn!(path = %self.path.display(), error = %err, "failed to remove job temp directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_removed_on_drop() {
        let path = {
            let guard = TempJobDir::create("test-job-temp-dir").expect("create temp dir");
            let path = guard.path().to_path_buf();
            assert!(path.exists());
            path
        };
        assert!(!path.exists());
    }
}
