//! Generation request and prompt rendering.

use crate::config::PipelineConfig;
use crate::error::{PostlineError, Result};
use crate::record::Calculator;
use std::fmt::Write as _;

/// Everything the model needs to write one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    topic: String,
    year: i32,
    categories: Vec<String>,
    calculator_menu: Vec<(Calculator, String, String)>,
}

impl GenerationRequest {
    /// Builds a request for `topic`, taking style constraints from `config`.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the topic is blank.
    pub fn new(topic: &str, year: i32, config: &PipelineConfig) -> Result<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PostlineError::InvalidInput("topic must not be empty".to_string()));
        }

        let calculator_menu = config
            .calculators
            .iter()
            .filter(|(calc, _)| **calc != Calculator::None)
            .map(|(calc, link)| (*calc, link.label.clone(), format!("{}{}", config.base_url(), link.path)))
            .collect();

        Ok(Self {
            topic: topic.to_string(),
            year,
            categories: config.categories.buckets.keys().cloned().collect(),
            calculator_menu,
        })
    }

    /// The trimmed topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Renders the single-shot prompt.
    pub fn to_prompt(&self) -> String {
        let years: Vec<String> = (self.year - 2..=self.year + 1).map(|y| y.to_string()).collect();
        let categories = self
            .categories
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let selectors = self
            .calculator_menu
            .iter()
            .map(|(calc, _, _)| format!("'{calc}'"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut prompt = format!(
            r#"Role: Senior Real Estate Investment Analyst (Top-tier Expert).
Task: Write a high-quality, professional blog post about "{topic}".

# CRITICAL RULES
1. CLICKABLE LINKS: You MUST use Markdown link format `[Text](URL)` for all internal calculators.
2. BULLET POINTS ONLY: No long prose. Use (*) for all analysis sections.
3. SUMMARY TABLE: Mandatory Markdown Table at the start of Body.
4. NO GREETINGS: Start directly with a Hook.
5. DATA SAFETY: Use realistic price ranges.

Format: Output ONLY a single valid JSON object.
JSON Keys:
- "viral_title": Provocative Korean title.
- "category": Choose ONE from [{categories}].
- "search_keyword": Topic-related keyword.
- "roi_data": {{"years": [{years}], "values": [4 realistic index numbers], "title": "Price Trend Forecast"}}
- "calculator_type": Choose ONE best match from [{selectors}].
- "blog_body_markdown": Korean Markdown content (Insert CLICKABLE links from the menu below). You may place [[MID_IMAGE]] once where a chart fits.
- "tistory_teaser": HTML Teaser content.

# CALCULATOR MENU (USE THESE LINKS EXACTLY):
"#,
            topic = self.topic,
            years = years.join(", "),
        );

        for (_, label, url) in &self.calculator_menu {
            let _ = writeln!(prompt, "- [{label}]({url})");
        }
        prompt
    }
}
