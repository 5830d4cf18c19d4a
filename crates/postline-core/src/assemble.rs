//! Document assembly.
//!
//! [`ContentAssembler::assemble`] is pure: the record, chart reference and
//! post date fully determine the output, and nothing touches disk or network.

use crate::config::PipelineConfig;
use crate::record::{Calculator, StructuredRecord};
use chrono::{DateTime, Duration, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

/// Placeholder the model may leave in the body where a chart fits.
pub const MID_IMAGE: &str = "[[MID_IMAGE]]";

/// Front matter date format.
pub const POST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[[A-Z0-9_]+\]\]").expect("placeholder regex should be valid")
});

/// Post date for a run started at `now`: one day earlier, to the second.
pub fn post_date<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    (now.clone() - Duration::days(1)).format(POST_DATE_FORMAT).to_string()
}

/// Front matter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// Post title.
    pub title: String,
    /// Post date, [`POST_DATE_FORMAT`].
    pub date: String,
    /// Draft flag; generated posts are published directly.
    pub draft: bool,
    /// Category labels.
    pub categories: Vec<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Summary line.
    pub description: String,
    /// Cover image path.
    pub image: String,
}

impl FrontMatter {
    /// Renders the `---` delimited block. Strings are double-quoted with JSON
    /// escaping, which is also valid YAML.
    pub fn render(&self) -> String {
        format!(
            "---\ntitle: {}\ndate: {}\ndraft: {}\ncategories: {}\ntags: {}\ndescription: {}\nimage: {}\n---\n",
            quote(&self.title),
            self.date,
            self.draft,
            quote_list(&self.categories),
            quote_list(&self.tags),
            quote(&self.description),
            quote(&self.image),
        )
    }
}

/// An assembled post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Metadata header.
    pub front_matter: FrontMatter,
    /// Body, placeholders resolved.
    pub body: String,
    /// Fixed footer.
    pub footer: String,
}

impl Document {
    /// Full file contents.
    pub fn render(&self) -> String {
        format!("{}\n\n{}{}", self.front_matter.render(), self.body, self.footer)
    }

    /// Post title.
    pub fn title(&self) -> &str {
        &self.front_matter.title
    }

    /// Post date.
    pub fn date(&self) -> &str {
        &self.front_matter.date
    }
}

/// An assembled document and the bucket it is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// The document.
    pub document: Document,
    /// Directory segment under the content tree.
    pub bucket: String,
}

/// Merges a record with the static tables into a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct ContentAssembler<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ContentAssembler<'a> {
    /// Creates an assembler over `config`.
    pub const fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Assembles the document for `record`. An empty `chart_ref` omits the chart.
    pub fn assemble(&self, record: &StructuredRecord, chart_ref: &str, post_date: &str) -> Assembly {
        let categories = &self.config.categories;
        let bucket = categories.bucket_for(record.category.as_deref()).to_string();
        let category = record
            .category
            .clone()
            .unwrap_or_else(|| categories.default_label().to_string());

        let mut tags = vec![record.keyword.clone()];
        tags.extend(self.config.style.fixed_tags.iter().cloned());

        let front_matter = FrontMatter {
            title: record.title.clone(),
            date: post_date.to_string(),
            draft: false,
            categories: vec![category],
            tags,
            description: record.title.clone(),
            image: chart_ref.to_string(),
        };

        let mut body = String::new();
        if !chart_ref.is_empty() {
            let _ = write!(body, "![전망 차트]({chart_ref})\n*▲ AI 분석 데이터 ({post_date} 기준)*\n\n");
        }
        body.push_str(&self.resolve_placeholders(&record.body, chart_ref, &record.series.caption));
        if let Some(block) = self.calculator_block(record.calculator) {
            body.push_str("\n\n");
            body.push_str(&block);
        }

        Assembly {
            document: Document { front_matter, body, footer: self.footer(&record.keyword) },
            bucket,
        }
    }

    fn resolve_placeholders(&self, body: &str, chart_ref: &str, caption: &str) -> String {
        let replacement = if self.config.features.inline_image && !chart_ref.is_empty() {
            format!("\n![{caption}]({chart_ref})\n")
        } else {
            String::new()
        };
        let body = body.replace(MID_IMAGE, &replacement);
        PLACEHOLDER_REGEX.replace_all(&body, "").into_owned()
    }

    fn calculator_block(&self, calculator: Calculator) -> Option<String> {
        if calculator == Calculator::None {
            return None;
        }
        let link = self.config.calculators.get(&calculator)?;
        Some(format!(
            r#"<div style="margin: 30px 0; text-align: center; background-color: #f8f9fa; padding: 20px; border-radius: 10px; border: 1px solid #e9ecef;">
    <p style="margin-bottom: 10px; font-weight: bold; color: #495057;">👇 이 매물, 내 조건으로 계산해보기</p>
    <a href="{base}{path}" target="_blank" style="display: inline-block; background-color: {color}; color: white; padding: 15px 30px; border-radius: 50px; font-weight: bold; text-decoration: none; box-shadow: 0 4px 6px rgba(0,0,0,0.1);">
        🧮 <strong>{label} 돌려보기</strong>
    </a>
</div>"#,
            base = self.config.base_url(),
            path = link.path,
            color = self.config.style.button_color,
            label = link.label,
        ))
    }

    fn footer(&self, keyword: &str) -> String {
        let base = self.config.base_url();
        let dsr_path = self
            .config
            .calculators
            .get(&Calculator::Dsr)
            .map_or("/calculators/calc_dsr/", |link| link.path.as_str());
        let search_url = format!("https://new.land.naver.com/search?sk={}", urlencoding::encode(keyword));

        format!(
            r#"

---
### 🛑 {keyword} 투자, 아직도 고민만 하시나요?

부동산은 **타이밍**이 생명입니다.
내 자금으로 가능한 **최고의 매물**이 무엇인지 지금 바로 확인하세요.

📉 **대출 가능 여부 확인**
👉 <a href="{base}{dsr_path}" target="_blank"><strong>💰 내 연봉으로 대출 한도 셀프 계산하기 (DSR 계산기)</strong></a>

🚀 **실시간 매물 호가 확인**
<a href="{search_url}" target="_blank">👉 <strong>네이버 부동산에서 '{keyword}' 시세/실거래가 확인하기 (클릭)</strong></a>

<br><hr><small>📢 **면책 조항 (Disclaimer)**<br>
본 포스팅은 부동산 데이터 분석에 기초한 정보 제공을 목적으로 하며, 투자의 법적 책임은 투자자 본인에게 있습니다.</small>
"#
        )
    }
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn quote_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}
