//! Recovery of a JSON record from decorated or damaged model text.
//!
//! Recovery runs as an ordered list of named [`Strategy`] values. The first
//! strategy that yields a JSON object wins; each one is usable on its own.

use crate::record::StructuredRecord;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

/// A single recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Strip code fences and language tags, then parse strictly.
    Strict,
    /// Parse the outermost balanced `{...}` substring.
    BraceExtraction,
    /// Drop commas directly before `}` or `]`, then parse.
    TrailingCommaStrip,
    /// Close an object that was cut off before its final brace.
    BraceCompletion,
}

impl Strategy {
    /// Strategies in the order they are attempted.
    pub const ORDER: [Self; 4] = [
        Self::Strict,
        Self::BraceExtraction,
        Self::TrailingCommaStrip,
        Self::BraceCompletion,
    ];

    /// Attempts this strategy alone.
    pub fn apply(self, text: &str) -> Option<Map<String, Value>> {
        let cleaned = strip_decoration(text);
        match self {
            Self::Strict => parse_object(cleaned),
            Self::BraceExtraction => outermost_object(cleaned).and_then(parse_object),
            Self::TrailingCommaStrip => {
                let candidate = outermost_object(cleaned).unwrap_or(cleaned);
                parse_object(&strip_trailing_commas(candidate))
            }
            Self::BraceCompletion => {
                if !cleaned.starts_with('{') || outermost_object(cleaned).is_some() {
                    return None;
                }
                complete_object(cleaned).and_then(|completed| parse_object(&completed))
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strict => "strict",
            Self::BraceExtraction => "brace_extraction",
            Self::TrailingCommaStrip => "trailing_comma_strip",
            Self::BraceCompletion => "brace_completion",
        };
        f.write_str(name)
    }
}

/// A recovered JSON object and the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Winning strategy.
    pub strategy: Strategy,
    /// Parsed top-level object.
    pub fields: Map<String, Value>,
}

impl Extraction {
    /// Reads the fields into a record, defaulting anything missing.
    pub fn into_record(self) -> StructuredRecord {
        StructuredRecord::from_fields(&self.fields)
    }
}

/// Runs every strategy in order and returns the first object recovered.
pub fn extract(text: &str) -> Option<Extraction> {
    for strategy in Strategy::ORDER {
        if let Some(fields) = strategy.apply(text) {
            debug!(strategy = %strategy, keys = fields.len(), "Recovered record");
            return Some(Extraction { strategy, fields });
        }
    }

    warn!(chars = text.chars().count(), "No JSON object could be recovered from model output");
    None
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Removes surrounding code fences and a bare leading `json` tag.
fn strip_decoration(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s = s.trim();
    for tag in ["json", "JSON"] {
        if let Some(rest) = s.strip_prefix(tag)
            && rest.trim_start().starts_with('{')
        {
            s = rest.trim_start();
        }
    }
    s
}

/// Char scanner that tracks whether it is inside a JSON string literal.
#[derive(Default)]
struct Lexer {
    in_string: bool,
    escaped: bool,
}

impl Lexer {
    /// Feeds one char; returns true if it is structural (outside any string).
    fn structural(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            false
        } else if c == '"' {
            self.in_string = true;
            false
        } else {
            true
        }
    }
}

/// The first `{` through its matching `}`, or `None` if it never closes.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut lexer = Lexer::default();
    let mut depth = 0usize;

    for (offset, c) in text[start..].char_indices() {
        if !lexer.structural(c) {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lexer = Lexer::default();

    for (i, c) in text.char_indices() {
        if lexer.structural(c) && c == ',' {
            let next = text[i + 1..].trim_start().chars().next();
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Closes an unterminated object: ends an open string, drops a dangling
/// comma or colon, then appends the missing closers innermost first.
fn complete_object(text: &str) -> Option<String> {
    let mut lexer = Lexer::default();
    let mut open: Vec<char> = Vec::new();

    for c in text.chars() {
        if !lexer.structural(c) {
            continue;
        }
        match c {
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }
    if open.is_empty() {
        return None;
    }

    let mut completed = text.trim_end().to_string();
    if lexer.in_string {
        if lexer.escaped {
            completed.pop();
        }
        completed.push('"');
    }
    while completed.ends_with(',') || completed.ends_with(':') {
        completed.pop();
        completed.truncate(completed.trim_end().len());
    }
    completed.extend(open.iter().rev());
    Some(strip_trailing_commas(&completed))
}
