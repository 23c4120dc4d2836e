//! Text helpers shared by the extractor and the enricher.

use unicode_normalization::UnicodeNormalization;

/// Leading glyphs that mark a paragraph as a bullet even at outline level 0.
pub const BULLET_GLYPHS: &[&str] = &["•", "-", "*", "→", "➢", "➤"];

/// Check whether a paragraph's text starts with a bullet glyph.
///
/// Numbered paragraphs ("1. First") are not bullets; only the outline level
/// can classify those.
pub fn is_bullet_text(text: &str) -> bool {
    let trimmed = text.trim();
    BULLET_GLYPHS.iter().any(|glyph| trimmed.starts_with(glyph))
}

/// Clean a piece of extracted text.
///
/// - Normalizes to Unicode NFC
/// - Turns vertical tabs (soft line breaks) and CRLF into `\n`
/// - Drops other control characters
/// - Trims leading/trailing whitespace
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace(['\r', '\u{b}'], "\n");

    text.nfc()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}
