//! Local text tools: word counter and case converter.

use crate::config::{Constraints, OptionSpec};
use crate::error::ToolError;
use crate::request::ToolRequest;
use crate::result::Artifact;
use crate::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const WORD_COUNT_NAME: &str = "word-count";
pub const CASE_NAME: &str = "case-converter";

pub const MAX_TEXT_BYTES: u64 = 1024 * 1024;

/// Average silent reading speed used for the estimate.
pub const WORDS_PER_MINUTE: usize = 200;

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());
static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());
static RE_TITLE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'’]*").unwrap());
static RE_SENTENCE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[.!?]\s+)(\p{Ll})").unwrap());

fn has_alnum(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}

// ── Word counter ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextStats {
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub reading_minutes: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let words = text.split_whitespace().filter(|w| has_alnum(w)).count();
        let reading_minutes = if words == 0 {
            0
        } else {
            words.div_ceil(WORDS_PER_MINUTE).max(1)
        };
        Self {
            words,
            characters: text.chars().count(),
            characters_no_spaces: text.chars().filter(|c| !c.is_whitespace()).count(),
            sentences: RE_SENTENCE_END
                .split(text)
                .filter(|s| has_alnum(s))
                .count(),
            paragraphs: RE_PARAGRAPH_BREAK
                .split(text)
                .filter(|p| !p.trim().is_empty())
                .count(),
            reading_minutes,
        }
    }
}

impl Artifact for TextStats {
    fn summary(&self) -> Vec<String> {
        vec![
            format!("{} words", self.words),
            format!(
                "{} characters ({} without spaces)",
                self.characters, self.characters_no_spaces
            ),
            format!("{} sentences, {} paragraphs", self.sentences, self.paragraphs),
            format!("~{} min read", self.reading_minutes),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountTool;

#[async_trait]
impl Tool for WordCountTool {
    type Output = TextStats;

    fn name(&self) -> &'static str {
        WORD_COUNT_NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("some text", MAX_TEXT_BYTES)
    }

    async fn process(&self, request: &ToolRequest) -> Result<TextStats, ToolError> {
        Ok(TextStats::of(request.payload.as_text().unwrap_or_default()))
    }
}

// ── Case converter ───────────────────────────────────────────────────────

pub const CASES: &[&str] = &[
    "upper",
    "lower",
    "title",
    "sentence",
    "camel",
    "pascal",
    "snake",
    "kebab",
    "alternating",
];

/// Split into words at non-alphanumerics and camelCase boundaries.
/// `"parseHTTPResponse_v2"` → `["parse", "HTTP", "Response", "v2"]`.
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for run in RE_ALNUM_RUN.find_iter(text) {
        let chars: Vec<char> = run.as_str().chars().collect();
        let mut start = 0;
        for i in 1..chars.len() {
            let (prev, cur) = (chars[i - 1], chars[i]);
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let boundary = (prev.is_lowercase() && cur.is_uppercase())
                || (prev.is_uppercase() && cur.is_uppercase() && next_lower);
            if boundary {
                words.push(chars[start..i].iter().collect());
                start = i;
            }
        }
        words.push(chars[start..].iter().collect());
    }
    words
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

/// Re-case `text`. `case` must be one of [`CASES`].
pub fn convert_case(text: &str, case: &str) -> String {
    match case {
        "upper" => text.to_uppercase(),
        "title" => RE_TITLE_WORD
            .replace_all(text, |c: &regex::Captures<'_>| capitalise(&c[0]))
            .into_owned(),
        "sentence" => {
            let lower = text.to_lowercase();
            RE_SENTENCE_START
                .replace_all(&lower, |c: &regex::Captures<'_>| {
                    format!("{}{}", &c[1], c[2].to_uppercase())
                })
                .into_owned()
        }
        "camel" | "pascal" => {
            let mut out = String::new();
            for (i, w) in split_words(text).iter().enumerate() {
                if i == 0 && case == "camel" {
                    out.push_str(&w.to_lowercase());
                } else {
                    out.push_str(&capitalise(w));
                }
            }
            out
        }
        "snake" | "kebab" => {
            let sep = if case == "snake" { "_" } else { "-" };
            split_words(text)
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join(sep)
        }
        "alternating" => {
            let mut upper = false;
            text.chars()
                .flat_map(|c| {
                    if c.is_alphabetic() {
                        let out: Vec<char> = if upper {
                            c.to_uppercase().collect()
                        } else {
                            c.to_lowercase().collect()
                        };
                        upper = !upper;
                        out
                    } else {
                        vec![c]
                    }
                })
                .collect()
        }
        _ => text.to_lowercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedText {
    pub case: String,
    pub text: String,
}

impl Artifact for ConvertedText {
    fn summary(&self) -> Vec<String> {
        vec![self.text.clone()]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseConvertTool;

#[async_trait]
impl Tool for CaseConvertTool {
    type Output = ConvertedText;

    fn name(&self) -> &'static str {
        CASE_NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("some text", MAX_TEXT_BYTES)
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::choice("case", CASES, "lower")]
    }

    async fn process(&self, request: &ToolRequest) -> Result<ConvertedText, ToolError> {
        let case = request.parameters.require("case")?;
        let text = request.payload.as_text().unwrap_or_default();
        Ok(ConvertedText {
            case: case.to_string(),
            text: convert_case(text, case),
        })
    }
}
