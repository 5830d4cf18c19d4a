//! Pipeline configuration.
//!
//! A single immutable [`PipelineConfig`] is loaded once at process start and
//! handed to every component. Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. Global config file (`~/.postline/config.toml`)
//! 3. Local config file (`./.postlinerc`)
//! 4. Environment variables (`GEMINI_API_KEY`, `BLOG_DIR`, `POSTLINE_BASE_URL`)

mod tables;

use crate::record::Calculator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use tables::{CalculatorLink, default_calculators, default_categories};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Where the site lives on disk and on the web.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public site root, also the fallback URL when publishing fails.
    pub base_url: String,
    /// Local checkout of the site repository.
    pub blog_dir: PathBuf,
    /// Content tree, relative to `blog_dir`.
    pub content_dir: PathBuf,
    /// Chart output directory, relative to `blog_dir`.
    pub image_dir: PathBuf,
    /// URL prefix under which `image_dir` is served.
    pub image_url_prefix: String,
    /// Teaser drafts directory, relative to `blog_dir`.
    pub drafts_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tech.mdeeno.com".to_string(),
            blog_dir: PathBuf::from("."),
            content_dir: PathBuf::from("content/posts"),
            image_dir: PathBuf::from("static/images"),
            image_url_prefix: "/images".to_string(),
            drafts_dir: PathBuf::from("tistory_drafts"),
        }
    }
}

/// Model candidates and generation limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider type (`gemini` or `mock`).
    pub provider: String,
    /// Candidate model IDs in priority order.
    pub candidates: Vec<String>,
    /// API key; usually supplied through `GEMINI_API_KEY` instead.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Endpoint override.
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Fixed sleep before the single retry of a rate-limited candidate.
    pub backoff_secs: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Deadline for the whole candidate loop.
    pub deadline_secs: u64,
    /// Send `BLOCK_NONE` safety thresholds.
    pub relax_safety: bool,
    /// Ask the provider for a JSON response body.
    pub json_mode: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            candidates: vec![
                "gemini-2.0-flash-exp".to_string(),
                "gemini-flash-latest".to_string(),
                "gemini-exp-1206".to_string(),
                "gemini-pro-latest".to_string(),
            ],
            api_key: None,
            base_url: None,
            temperature: 0.3,
            backoff_secs: 10,
            request_timeout_secs: 120,
            deadline_secs: 600,
            relax_safety: true,
            json_mode: false,
        }
    }
}

impl GenerationConfig {
    /// Backoff before retrying a rate-limited candidate.
    pub const fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    /// Per-request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Deadline for the whole generation step.
    pub const fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Version control settings for the publish step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Stage, commit and push after writing the document.
    pub push: bool,
    /// Remote name.
    pub remote: String,
    /// Branch to push.
    pub branch: String,
    /// Commit message prefix; the message is `"<verb>: <title>"`.
    pub commit_verb: String,
    /// Lock file, relative to `blog_dir`, that serializes publishing.
    /// Must live outside the staged tree.
    pub lock_file: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            push: true,
            remote: "origin".to_string(),
            branch: "main".to_string(),
            commit_verb: "Auto Post".to_string(),
            lock_file: PathBuf::from(".git/postline.lock"),
        }
    }
}

/// Static feature toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Replace the body placeholder with the chart image instead of removing it.
    pub inline_image: bool,
}

/// Colors and fixed tags used by the templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Chart bar color.
    pub primary_color: String,
    /// Chart line color.
    pub line_color: String,
    /// Related-tool button color.
    pub button_color: String,
    /// Teaser call-to-action color.
    pub teaser_color: String,
    /// Tags appended after the keyword tag.
    pub fixed_tags: Vec<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            primary_color: "#FF5252".to_string(),
            line_color: "#D32F2F".to_string(),
            button_color: "#00C853".to_string(),
            teaser_color: "#D32F2F".to_string(),
            fixed_tags: vec!["부동산투자".to_string(), "재테크".to_string()],
        }
    }
}

/// Category label to bucket routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTable {
    /// Bucket for unknown or missing categories.
    pub default_bucket: String,
    /// Label → bucket.
    pub buckets: BTreeMap<String, String>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self { default_bucket: "tips".to_string(), buckets: default_categories() }
    }
}

impl CategoryTable {
    /// Resolves a category label to its bucket, falling back to the default bucket.
    pub fn bucket_for(&self, label: Option<&str>) -> &str {
        label
            .map(str::trim)
            .and_then(|l| self.buckets.get(l))
            .map_or(self.default_bucket.as_str(), String::as_str)
    }

    /// Label displayed for a record that carries no category.
    pub fn default_label(&self) -> &str {
        self.buckets
            .iter()
            .find(|(_, bucket)| **bucket == self.default_bucket)
            .map_or(self.default_bucket.as_str(), |(label, _)| label.as_str())
    }
}

/// Root configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Site layout.
    pub site: SiteConfig,
    /// Generation settings.
    pub generation: GenerationConfig,
    /// Publishing settings.
    pub publish: PublishConfig,
    /// Feature toggles.
    pub features: FeatureFlags,
    /// Template styling.
    pub style: StyleConfig,
    /// Category routing.
    pub categories: CategoryTable,
    /// Calculator → link.
    pub calculators: BTreeMap<Calculator, CalculatorLink>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            generation: GenerationConfig::default(),
            publish: PublishConfig::default(),
            features: FeatureFlags::default(),
            style: StyleConfig::default(),
            categories: CategoryTable::default(),
            calculators: default_calculators(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a single TOML file layered over the defaults.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let value = read_toml(path)?;
        Self::from_toml_value(value)
    }

    /// Parse configuration from a TOML string layered over the defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let value: toml::Value =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_toml_value(value)
    }

    /// Deserializes `overlay` merged on top of the serialized defaults, so
    /// partial tables (a single calculator, one category) extend the defaults.
    fn from_toml_value(overlay: toml::Value) -> ConfigResult<Self> {
        let mut merged = toml::Value::try_from(Self::default())
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize defaults: {}", e)))?;
        merge_toml(&mut merged, overlay);
        merged.try_into().map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".postline")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".postlinerc")
    }

    /// Discover and load configuration files, then apply environment overrides.
    ///
    /// An explicit `path` replaces the local file. Missing files are skipped;
    /// unreadable or malformed files are errors.
    pub fn discover_and_load(path: Option<&Path>) -> ConfigResult<Self> {
        let local = path.map_or_else(Self::default_local_path, Path::to_path_buf);
        if path.is_some() && !local.exists() {
            return Err(ConfigError::NotFound(local.display().to_string()));
        }

        let mut merged = toml::Value::Table(toml::map::Map::new());
        for candidate in [Self::default_global_path(), local] {
            if candidate.exists() {
                debug!(path = %candidate.display(), "Loading config file");
                merge_toml(&mut merged, read_toml(&candidate)?);
            }
        }

        let mut config = Self::from_toml_value(merged)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply process environment overrides.
    #[allow(clippy::disallowed_methods)] // env::var is needed for secrets and paths
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides from an arbitrary lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Some(dir) = non_empty("BLOG_DIR") {
            self.site.blog_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty("POSTLINE_BASE_URL") {
            self.site.base_url = url;
        }
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.generation.candidates.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "generation.candidates must list at least one model".to_string(),
            ));
        }
        if self.site.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue("site.base_url must not be empty".to_string()));
        }
        if self.generation.deadline_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "generation.deadline_secs must be greater than zero".to_string(),
            ));
        }
        if self.categories.default_bucket.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "categories.default_bucket must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Site root without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.site.base_url.trim_end_matches('/')
    }

    /// Absolute content tree root.
    pub fn content_root(&self) -> PathBuf {
        self.site.blog_dir.join(&self.site.content_dir)
    }

    /// Absolute chart output directory.
    pub fn image_root(&self) -> PathBuf {
        self.site.blog_dir.join(&self.site.image_dir)
    }

    /// Absolute drafts directory.
    pub fn drafts_root(&self) -> PathBuf {
        self.site.blog_dir.join(&self.site.drafts_dir)
    }

    /// Absolute publish lock path.
    pub fn lock_path(&self) -> PathBuf {
        self.site.blog_dir.join(&self.publish.lock_file)
    }

    /// Candidate IDs with blanks removed.
    pub fn candidate_ids(&self) -> Vec<String> {
        self.generation
            .candidates
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn read_toml(path: &Path) -> ConfigResult<toml::Value> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Deep-merges `overlay` into `base`; tables merge key by key, everything else replaces.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.generation.candidates.len(), 4);
        assert_eq!(config.categories.default_bucket, "tips");
        assert_eq!(config.calculators.len(), 9);
        assert!(!config.features.inline_image);
    }

    #[test]
    fn test_load_from_file_layers_over_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_content = r#"
[site]
base_url = "https://example.test/"
blog_dir = "/srv/blog"

[generation]
candidates = ["model-a", "model-b"]
backoff_secs = 1

[features]
inline_image = true

[calculators.dsr]
path = "/tools/dsr/"
label = "DSR"
"#;
        std::fs::write(&config_path, config_content).unwrap();

        let config = PipelineConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.base_url(), "https://example.test");
        assert_eq!(config.site.blog_dir, PathBuf::from("/srv/blog"));
        assert_eq!(config.site.content_dir, PathBuf::from("content/posts"));
        assert_eq!(config.generation.candidates, vec!["model-a", "model-b"]);
        assert_eq!(config.generation.backoff(), Duration::from_secs(1));
        assert_eq!(config.generation.temperature, 0.3);
        assert!(config.features.inline_image);
        assert_eq!(config.calculators[&Calculator::Dsr].path, "/tools/dsr/");
        assert_eq!(config.calculators.len(), 9);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load_from_file(Path::new("/nonexistent/postline.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = PipelineConfig::from_toml_str("[site\nbase_url = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_merge_toml_overrides_nested_keys_only() {
        let mut base: toml::Value =
            toml::from_str("[site]\nbase_url = \"a\"\nblog_dir = \"/x\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("[site]\nbase_url = \"b\"\n").unwrap();
        merge_toml(&mut base, overlay);

        assert_eq!(base["site"]["base_url"].as_str(), Some("b"));
        assert_eq!(base["site"]["blog_dir"].as_str(), Some("/x"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "secret"),
            ("BLOG_DIR", "/data/blog"),
            ("POSTLINE_BASE_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::default();
        config.apply_env_from(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
        assert_eq!(config.site.blog_dir, PathBuf::from("/data/blog"));
        assert_eq!(config.site.base_url, "https://tech.mdeeno.com");
    }

    #[test]
    fn test_validate_rejects_empty_candidates() {
        let mut config = PipelineConfig::default();
        config.generation.candidates = vec!["  ".to_string()];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let mut config = PipelineConfig::default();
        config.generation.deadline_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_category_table_routing() {
        let table = CategoryTable::default();
        assert_eq!(table.bucket_for(Some("투자 꿀팁")), "tips");
        assert_eq!(table.bucket_for(Some(" 청약 정보 ")), "subscription");
        assert_eq!(table.bucket_for(Some("unknown")), "tips");
        assert_eq!(table.bucket_for(None), "tips");
        assert_eq!(table.default_label(), "투자 꿀팁");
    }

    #[test]
    fn test_save_and_load_round_trip_keeps_api_key_out() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = PipelineConfig::default();
        config.generation.api_key = Some("secret".to_string());
        config.save_to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("secret"));

        let loaded = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.generation.candidates, config.generation.candidates);
        assert_eq!(loaded.calculators, config.calculators);
        assert!(loaded.generation.api_key.is_none());
    }
}
