//! Deterministic text cleanup that turns raw page text into paragraphs.
//!
//! PDF text comes out hard-wrapped at the layout width, with the page number
//! printed as the last line. The rules here undo both:
//!
//! 1. **Line endings**: pdfium reports `\r\n`; everything below assumes `\n`.
//! 2. **Page number**: a trailing `\n<digits>` (optionally followed by one
//!    final newline) is replaced with a single `\n`.
//! 3. **Rejoin**: a newline between a letter/hyphen/comma/closing paren and a
//!    lowercase letter or opening paren is a soft wrap; it becomes a space.
//! 4. **Split**: what remains is split on `\n`. Empty strings stay in the
//!    sequence as empty paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Compiled regexes ─────────────────────────────────────────────────────

static RE_PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\d+(\n?)$").expect("valid regex"));

static RE_SOFT_WRAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z\-,)]\n[a-z(]").expect("valid regex"));

// ── Public API ───────────────────────────────────────────────────────────

/// Turn the text of each selected page (in page order) into paragraphs.
pub fn paragraphs_from_pages(pages: &[String]) -> Vec<String> {
    let joined: String = pages
        .iter()
        .map(|page| strip_page_number(&normalise_line_endings(page)))
        .collect();
    split_paragraphs(&rejoin_wrapped_lines(&joined))
}

/// Convert `\r\n` and lone `\r` to `\n`.
pub fn normalise_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Replace a trailing page number line with a single newline.
pub fn strip_page_number(page: &str) -> String {
    RE_PAGE_NUMBER.replace(page, "\n$1").into_owned()
}

/// Join soft-wrapped lines with a space.
pub fn rejoin_wrapped_lines(text: &str) -> String {
    RE_SOFT_WRAP
        .replace_all(text, |caps: &regex::Captures| caps[0].replacen('\n', " ", 1))
        .into_owned()
}

/// Split on `\n`, keeping empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}
