//! Writing documents into the site tree and syncing them to the remote.
//!
//! The local file is written first and is never removed. Every failure after
//! that point (lock, stage, commit, push) degrades to the site's base URL
//! instead of propagating.

mod git;
mod lock;

pub use git::{GitCli, VersionControl};
pub use lock::PublishLock;

use crate::assemble::Document;
use crate::config::PipelineConfig;
use crate::hash::sha256_hex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Characters stripped from titles before they become file names.
const ILLEGAL_PATH_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Byte budget for a slug; file systems cap a name at 255 bytes.
const MAX_SLUG_BYTES: usize = 100;

/// Errors that can occur while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A git subprocess exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    GitCommandFailed {
        /// Git subcommand.
        command: String,
        /// Trimmed stderr.
        stderr: String,
    },

    /// Another run holds the publish lock.
    #[error("Publish lock held: {0}")]
    Locked(String),
}

/// Outcome of a publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    /// Canonical post URL, or the site root when syncing failed.
    pub url: String,
    /// Local document path; always written.
    pub path: PathBuf,
    /// True when the document was committed and pushed.
    pub published: bool,
}

/// File-name-safe form of `title`: illegal characters dropped, whitespace
/// runs collapsed to `-` and the result cut to [`MAX_SLUG_BYTES`] on a char
/// boundary.
pub fn slugify(title: &str) -> String {
    let cleaned: String = title.chars().filter(|c| !ILLEGAL_PATH_CHARS.contains(c)).collect();
    let mut slug = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.len() > MAX_SLUG_BYTES {
        let cut = (0..=MAX_SLUG_BYTES).rev().find(|&i| slug.is_char_boundary(i)).unwrap_or(0);
        slug.truncate(cut);
        slug.truncate(slug.trim_end_matches('-').len());
    }
    if slug.is_empty() { "post".to_string() } else { slug }
}

/// File name for `document`: `<date>-<slug>-<hash8>.md`.
pub fn file_name_for(document: &Document, rendered: &str) -> String {
    let date = document.date().split_whitespace().next().unwrap_or_default();
    let hash = sha256_hex(rendered.as_bytes());
    format!("{}-{}-{}.md", date, slugify(document.title()), &hash[..8])
}

/// Writes documents and syncs them through a [`VersionControl`] backend.
pub struct ArtifactPublisher<'a> {
    config: &'a PipelineConfig,
    vcs: &'a dyn VersionControl,
}

impl<'a> ArtifactPublisher<'a> {
    /// Creates a publisher over `config` using `vcs` for remote sync.
    pub fn new(config: &'a PipelineConfig, vcs: &'a dyn VersionControl) -> Self {
        Self { config, vcs }
    }

    /// Writes `document` under `bucket` and syncs it when pushing is enabled.
    ///
    /// # Errors
    /// Only when the local file cannot be written.
    pub fn publish(&self, document: &Document, bucket: &str) -> Result<PublishResult, PublishError> {
        let rendered = document.render();
        let dir = self.config.content_root().join(bucket);
        std::fs::create_dir_all(&dir)?;

        let file_name = file_name_for(document, &rendered);
        let path = dir.join(&file_name);
        std::fs::write(&path, &rendered)?;
        info!(path = %path.display(), "Wrote document");

        let canonical = self.canonical_url(bucket, &file_name);
        if !self.config.publish.push {
            info!(url = %canonical, "Push disabled, skipping remote sync");
            return Ok(PublishResult { url: canonical, path, published: false });
        }

        match self.sync(document.title()) {
            Ok(()) => {
                info!(url = %canonical, "Published");
                Ok(PublishResult { url: canonical, path, published: true })
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Publish failed, keeping local file");
                Ok(PublishResult { url: self.config.base_url().to_string(), path, published: false })
            }
        }
    }

    fn sync(&self, title: &str) -> Result<(), PublishError> {
        let repo = self.config.site.blog_dir.as_path();
        let publish = &self.config.publish;
        let _lock = PublishLock::acquire(&self.config.lock_path())?;

        self.vcs.stage_all(repo)?;
        self.vcs.commit(repo, &format!("{}: {}", publish.commit_verb, title))?;
        self.vcs.push(repo, &publish.remote, &publish.branch)
    }

    fn canonical_url(&self, bucket: &str, file_name: &str) -> String {
        let section = self
            .config
            .site
            .content_dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("posts");
        let stem = Path::new(file_name).file_stem().and_then(|s| s.to_str()).unwrap_or(file_name);
        format!("{}/{}/{}/{}", self.config.base_url(), section, bucket, stem)
    }
}
