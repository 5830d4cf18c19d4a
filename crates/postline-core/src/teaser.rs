//! Teaser drafts for the secondary, manually operated channel.

use crate::config::PipelineConfig;
use crate::publish::slugify;
use std::path::{Path, PathBuf};
use tracing::info;

/// Call-to-action text on the teaser button.
pub const TEASER_CTA: &str = "👉 리포트 전문(Full) 무료로 보기";

/// Formats teaser snippets and writes them to the drafts directory.
#[derive(Debug, Clone)]
pub struct TeaserWriter {
    drafts_dir: PathBuf,
    button_color: String,
}

impl TeaserWriter {
    /// Creates a writer that stores drafts in `drafts_dir`.
    pub fn new(drafts_dir: impl Into<PathBuf>, button_color: &str) -> Self {
        Self { drafts_dir: drafts_dir.into(), button_color: button_color.to_string() }
    }

    /// Creates a writer from the configured drafts directory and teaser color.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.drafts_root(), &config.style.teaser_color)
    }

    /// Drafts directory.
    pub fn drafts_dir(&self) -> &Path {
        &self.drafts_dir
    }

    /// HTML snippet linking back to `publish_url`.
    pub fn format(&self, title: &str, teaser_body: &str, publish_url: &str) -> String {
        format!(
            r#"<div style="font-size: 16px; line-height: 1.8;">
    <h2>{title}</h2><br>
    {teaser_body}
    <br><br>
    <div style="text-align: center; margin-top: 20px;">
        <a href="{publish_url}" target="_blank" style="display: inline-block; background-color: {color}; color: white; padding: 15px 40px; text-decoration: none; font-weight: bold; border-radius: 8px; font-size: 18px; box-shadow: 0 4px 6px rgba(0,0,0,0.2);">
            {TEASER_CTA}
        </a>
    </div>
</div>
"#,
            color = self.button_color,
        )
    }

    /// Writes the snippet to `<drafts_dir>/Tistory-<slug>.txt` and returns its path.
    pub fn write(&self, title: &str, teaser_body: &str, publish_url: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.drafts_dir)?;
        let path = self.drafts_dir.join(format!("Tistory-{}.txt", slugify(title)));
        std::fs::write(&path, self.format(title, teaser_body, publish_url))?;
        info!(path = %path.display(), "Wrote teaser draft");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_links_to_publish_url() {
        let writer = TeaserWriter::new("drafts", "#D32F2F");
        let html = writer.format("T", "<p>t</p>", "https://example.test/posts/tips/x");

        assert!(html.contains("<h2>T</h2>"));
        assert!(html.contains("<p>t</p>"));
        assert!(html.contains(r#"href="https://example.test/posts/tips/x""#));
        assert!(html.contains("background-color: #D32F2F"));
        assert!(html.contains(TEASER_CTA));
    }

    #[test]
    fn test_write_creates_drafts_directory() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TeaserWriter::new(temp_dir.path().join("tistory_drafts"), "#000");

        let path = writer.write("한강뷰: 전망", "<p>t</p>", "https://example.test").unwrap();

        assert_eq!(path.file_name().unwrap(), "Tistory-한강뷰-전망.txt");
        assert!(std::fs::read_to_string(path).unwrap().contains("https://example.test"));
    }

    #[test]
    fn test_write_long_title() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TeaserWriter::new(temp_dir.path(), "#000");

        let path = writer.write(&"서울 아파트 시장 전망".repeat(12), "<p>t</p>", "https://example.test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_from_config_uses_blog_dir() {
        let mut config = PipelineConfig::default();
        config.site.blog_dir = PathBuf::from("/srv/blog");
        let writer = TeaserWriter::from_config(&config);
        assert_eq!(writer.drafts_dir(), Path::new("/srv/blog/tistory_drafts"));
    }
}
