//! Heading-aware segmentation of OCR page markdown.
//!
//! Level-one and level-two Markdown headings are rewritten into `[SECTION] <title>` and the page is
//! cut immediately before every marker, so each segment starts at its heading. Segments are trimmed
//! and empty ones dropped; nothing here bounds their length.

use regex::Regex;
use std::sync::LazyLock;

/// Marker prefixed to every detected heading.
pub const SECTION_MARKER: &str = "[SECTION]";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,2} ([^\r\n]*)").expect("heading pattern is valid"));

/// Rewrite `# Title` / `## Title` lines into `[SECTION] Title`.
pub fn tag_headings(page_text: &str) -> String {
    HEADING
        .replace_all(page_text, format!("{SECTION_MARKER} $1").as_str())
        .into_owned()
}

/// Split one page's text into ordered, non-empty, heading-bounded segments.
///
/// A page without headings yields a single segment holding the whole trimmed page.
pub fn segment(page_text: &str) -> Vec<String> {
    let tagged = tag_headings(page_text);
    split_before_markers(&tagged)
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_before_markers(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(SECTION_MARKER) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    pieces.push(&text[start..]);
    pieces
}
