//! Version control backends.

use super::PublishError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// The three remote-sync steps of a publish.
pub trait VersionControl: Send + Sync {
    /// Stage every change in `repo`.
    fn stage_all(&self, repo: &Path) -> Result<(), PublishError>;

    /// Commit staged changes with `message`.
    fn commit(&self, repo: &Path, message: &str) -> Result<(), PublishError>;

    /// Push `branch` to `remote`.
    fn push(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), PublishError>;
}

/// Runs the `git` binary found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    fn run(repo: &Path, args: &[&str]) -> Result<(), PublishError> {
        debug!(repo = %repo.display(), args = ?args, "Running git");
        let output = Command::new("git").args(args).current_dir(repo).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublishError::GitCommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

impl VersionControl for GitCli {
    fn stage_all(&self, repo: &Path) -> Result<(), PublishError> {
        Self::run(repo, &["add", "--all"])
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<(), PublishError> {
        Self::run(repo, &["commit", "-m", message])
    }

    fn push(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), PublishError> {
        Self::run(repo, &["push", remote, branch])
    }
}
