//! Line classification for restructured content.
//!
//! Model replies use a light markdown dialect: `#` headings, `- `/`* `
//! bullets and `1. `/`1) ` numbered items. Renderers that do not emit
//! markdown themselves map these lines onto their own structures.

use regex::Regex;
use std::sync::LazyLock;

/// `12. text` or `12) text`.
static NUMBERED_ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").unwrap());

/// One non-blank line of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLine<'a> {
    /// `level` is the number of leading `#`.
    Heading { level: usize, text: &'a str },
    Bullet(&'a str),
    Numbered(&'a str),
    Paragraph(&'a str),
}

/// Classify a single line. Returns `None` for blank lines.
pub fn classify(line: &str) -> Option<ContentLine<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('#') {
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        return Some(ContentLine::Heading {
            level,
            text: trimmed[level..].trim(),
        });
    }

    if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return Some(ContentLine::Bullet(rest.trim()));
    }

    if let Some(caps) = NUMBERED_ITEM_REGEX.captures(trimmed) {
        if let Some(text) = caps.get(2) {
            return Some(ContentLine::Numbered(text.as_str().trim()));
        }
    }

    Some(ContentLine::Paragraph(trimmed))
}

/// Classify every non-blank line of `text`.
pub fn classify_lines(text: &str) -> Vec<ContentLine<'_>> {
    text.lines().filter_map(classify).collect()
}
