//! Exclusive publish lock.

use super::PublishError;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Held while a run stages, commits and pushes. Released on drop.
#[derive(Debug)]
pub struct PublishLock {
    path: PathBuf,
}

impl PublishLock {
    /// Creates the lock file, failing if another run holds it.
    pub fn acquire(path: &Path) -> Result<Self, PublishError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PublishError::Locked(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!(path = %path.display(), "Acquired publish lock");

        Ok(Self { path: path.to_path_buf() })
    }
}

impl Drop for PublishLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release publish lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("postline.lock");

        let first = PublishLock::acquire(&path).unwrap();
        assert!(matches!(PublishLock::acquire(&path), Err(PublishError::Locked(_))));

        drop(first);
        assert!(!path.exists());
        assert!(PublishLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no-such-dir").join("postline.lock");
        assert!(matches!(PublishLock::acquire(&path), Err(PublishError::Io(_))));
    }
}
