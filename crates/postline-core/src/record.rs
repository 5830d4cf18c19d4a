//! The structured record recovered from a model response.
//!
//! Reading is tolerant: every field has a default and nothing is rejected.
//! Wrong types are coerced where the intent is obvious (numbers as strings,
//! years as numbers) and replaced by the default otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Title used when the model gives none.
pub const DEFAULT_TITLE: &str = "부동산 리포트";
/// Keyword used when the model gives none.
pub const DEFAULT_KEYWORD: &str = "부동산";
/// Chart caption used when the model gives none.
pub const DEFAULT_CAPTION: &str = "Price Trend";
/// Body used by the fallback record.
pub const FALLBACK_BODY: &str = "AI 분석 데이터를 불러오지 못했습니다. 최신 시세와 계산기 링크를 먼저 확인해 주세요.";

/// Related-tool selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calculator {
    /// DSR and loan limit.
    Dsr,
    /// Loan interest.
    Interest,
    /// Brokerage fee.
    Fee,
    /// Acquisition tax.
    Tax,
    /// Capital gains tax.
    Transfer,
    /// Holding tax.
    Hold,
    /// Subscription score.
    Sub,
    /// Jeonse/monthly rent conversion.
    Rent,
    /// Take-home salary.
    Salary,
    /// No related tool.
    #[default]
    None,
}

impl Calculator {
    /// Every selectable calculator, `None` excluded.
    pub const ALL: [Self; 9] = [
        Self::Dsr,
        Self::Interest,
        Self::Fee,
        Self::Tax,
        Self::Transfer,
        Self::Hold,
        Self::Sub,
        Self::Rent,
        Self::Salary,
    ];

    /// Wire name of the selector.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dsr => "dsr",
            Self::Interest => "interest",
            Self::Fee => "fee",
            Self::Tax => "tax",
            Self::Transfer => "transfer",
            Self::Hold => "hold",
            Self::Sub => "sub",
            Self::Rent => "rent",
            Self::Salary => "salary",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Calculator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dsr" => Ok(Self::Dsr),
            "interest" => Ok(Self::Interest),
            "fee" => Ok(Self::Fee),
            "tax" => Ok(Self::Tax),
            "transfer" => Ok(Self::Transfer),
            "hold" => Ok(Self::Hold),
            "sub" | "subscription" => Ok(Self::Sub),
            "rent" => Ok(Self::Rent),
            "salary" => Ok(Self::Salary),
            "none" | "" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// A small labelled series for the chart.
///
/// Invariant: `labels.len() == values.len() >= 2` and every value is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSeries {
    /// X-axis labels (usually years).
    pub labels: Vec<String>,
    /// Y values.
    pub values: Vec<f64>,
    /// Unit shown next to values; may be empty.
    pub unit: String,
    /// Chart title.
    pub caption: String,
}

impl Default for NumericSeries {
    fn default() -> Self {
        Self {
            labels: ["2024", "2025", "2026", "2027"].map(String::from).to_vec(),
            values: vec![100.0, 105.0, 110.0, 115.0],
            unit: String::new(),
            caption: DEFAULT_CAPTION.to_string(),
        }
    }
}

impl NumericSeries {
    /// Reads a series object, repairing or replacing it to keep the invariant.
    fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(obj)) = value else {
            return Self::default();
        };

        let caption = string_field(obj, &["title", "caption"])
            .unwrap_or_else(|| DEFAULT_CAPTION.to_string());
        let unit = string_field(obj, &["unit"]).unwrap_or_default();

        // A label that is not a string or number would shift every later
        // label against its value, so it invalidates the series.
        let labels: Option<Vec<String>> = obj
            .get("years")
            .or_else(|| obj.get("labels"))
            .and_then(Value::as_array)
            .and_then(|items| items.iter().map(label_of).collect());
        let values: Option<Vec<f64>> = obj
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(number_of).collect());

        match (labels, values) {
            (Some(mut labels), Some(mut values)) if labels.len() >= 2 && values.len() >= 2 => {
                let len = labels.len().min(values.len());
                labels.truncate(len);
                values.truncate(len);
                Self { labels, values, unit, caption }.sanitized()
            }
            _ => {
                debug!("Series missing or malformed, using default series");
                Self { unit, caption, ..Self::default() }
            }
        }
    }

    /// Smallest and largest value.
    pub fn bounds(&self) -> (f64, f64) {
        self.values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
    }
}

/// Structured output of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Post title.
    pub title: String,
    /// Category label; `None` when the model gave none.
    pub category: Option<String>,
    /// Location or search keyword.
    pub keyword: String,
    /// Chart data.
    pub series: NumericSeries,
    /// Related tool.
    pub calculator: Calculator,
    /// Markdown body, possibly containing placeholder tokens.
    pub body: String,
    /// Short HTML teaser for the drafts channel.
    pub teaser: String,
}

impl StructuredRecord {
    /// The fixed record used when generation or extraction fails.
    pub fn fallback() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            category: None,
            keyword: DEFAULT_KEYWORD.to_string(),
            series: NumericSeries::default(),
            calculator: Calculator::None,
            body: FALLBACK_BODY.to_string(),
            teaser: String::new(),
        }
    }

    /// Builds a record from a parsed JSON object, defaulting anything missing.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let calculator = string_field(fields, &["calculator_type", "calculator"])
            .map_or(Calculator::None, |raw| {
                raw.parse().unwrap_or_else(|()| {
                    debug!(calculator = %raw, "Unknown calculator selector, ignoring");
                    Calculator::None
                })
            });

        Self {
            title: non_blank(string_field(fields, &["viral_title", "title"]))
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            category: non_blank(string_field(fields, &["category"])),
            keyword: non_blank(string_field(fields, &["search_keyword", "keyword"]))
                .unwrap_or_else(|| DEFAULT_KEYWORD.to_string()),
            series: NumericSeries::from_value(fields.get("roi_data").or_else(|| fields.get("series"))),
            calculator,
            body: string_field(fields, &["blog_body_markdown", "body"]).unwrap_or_default(),
            teaser: string_field(fields, &["tistory_teaser", "teaser"]).unwrap_or_default(),
        }
    }
}

/// First key present among `keys`, rendered as a string if it is a scalar.
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric value or NaN; NaN entries invalidate the whole series.
fn number_of(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    };
    parsed.filter(|v: &f64| v.is_finite()).unwrap_or(f64::NAN)
}

impl NumericSeries {
    /// True when the invariant holds.
    pub fn is_valid(&self) -> bool {
        self.labels.len() == self.values.len()
            && self.values.len() >= 2
            && self.values.iter().all(|v| v.is_finite())
    }

    /// Returns `self` if valid, otherwise the default series with the same caption.
    #[must_use]
    pub fn sanitized(self) -> Self {
        if self.is_valid() {
            self
        } else {
            debug!("Series has non-numeric values, using default series");
            Self { caption: self.caption, unit: self.unit, ..Self::default() }
        }
    }
}
