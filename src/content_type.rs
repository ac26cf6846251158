//! Clipboard content classification
//!
//! Detects what kind of text landed on the clipboard so items can be
//! auto-categorized at ingestion time. Patterns are compiled once and
//! reused for the lifetime of the process.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Classification verdict for a clipboard capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Color,
    Url,
    Email,
    Phone,
    Number,
    Code,
    Text,
    Image,
}

impl ContentType {
    /// String form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Color => "color",
            ContentType::Url => "links",
            ContentType::Email => "email",
            ContentType::Phone => "phone",
            ContentType::Number => "number",
            ContentType::Code => "code",
            ContentType::Text => "text",
            ContentType::Image => "image",
        }
    }

    /// Built-in category each content type is filed under.
    pub fn auto_category(&self) -> &'static str {
        match self {
            ContentType::Color => "color",
            ContentType::Url => "links",
            ContentType::Email => "email",
            ContentType::Phone => "phone",
            ContentType::Number => "number",
            ContentType::Code => "code",
            ContentType::Text => "text",
            ContentType::Image => "image",
        }
    }
}

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap())
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(https?://|www\.)[^\s]+|^[^\s]+\.(com|org|net|edu|gov|io|co|app|dev|tech|ai|me|info|biz)(/[^\s]*)?$",
        )
        .unwrap()
    })
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\+?1?\s?)?(\([0-9]{3}\)|[0-9]{3})[\s\-]?[0-9]{3}[\s\-]?[0-9]{4}$").unwrap()
    })
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").unwrap())
}

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(function\s+\w+|const\s+\w+\s*=|let\s+\w+\s*=|var\s+\w+\s*=|class\s+\w+|def\s+\w+|import\s+|export\s+|return\s+|public\s+|private\s+|protected\s+|\{[^}]*\}|;$|\=\>|\:\:)",
        )
        .unwrap()
    })
}

/// Classify clipboard text.
///
/// Checks run most-specific first: a hex color is also a valid "number-ish"
/// string, and phone numbers would otherwise match the number pattern.
pub fn detect_content_type(content: &str) -> ContentType {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return ContentType::Text;
    }

    if hex_color_regex().is_match(trimmed) {
        return ContentType::Color;
    }
    if url_regex().is_match(trimmed) {
        return ContentType::Url;
    }
    if email_regex().is_match(trimmed) {
        return ContentType::Email;
    }
    if phone_regex().is_match(trimmed) {
        return ContentType::Phone;
    }
    if number_regex().is_match(trimmed) {
        return ContentType::Number;
    }
    if code_regex().is_match(trimmed) {
        return ContentType::Code;
    }

    ContentType::Text
}
