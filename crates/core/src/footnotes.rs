//! Footnote marker and definition recognition.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Block, Inline};
use crate::metadata::clean_text;

/// Textual markers inside running prose: `(1)`, `[12]`.
static INLINE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d{1,3})\)|\[(\d{1,3})\]").unwrap());

/// A marker opening a definition: `(1) `, `[1] `, `1. `, `1) `.
static LEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\((\d{1,3})\)|\[(\d{1,3})\]|(\d{1,3})[.)])\s*").unwrap());

/// Content of a `<sup>` that reads as a marker: `1`, `(1)`, `[1]`.
static SUP_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\[(]?(\d{1,3})[\])]?$").unwrap());

/// Digits at the end of a footnote anchor target (`#fn3`, `#footnote-3`, `#fn:3`).
static ANCHOR_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,3})$").unwrap());

const NOTES_HEADINGS: &[&str] = &["notas", "nota", "referencias", "notes", "references", "footnotes"];

/// Label of a `<sup>` marker, if its text is one.
pub fn sup_label(text: &str) -> Option<String> {
    let text = clean_text(text);
    SUP_LABEL.captures(&text).map(|caps| normalize_label(&caps[1]))
}

/// Label of a footnote anchor such as `<a href="#fn2">`.
pub fn anchor_label(href: &str) -> Option<String> {
    let target = href.strip_prefix('#')?;
    if !(target.starts_with("fn") || target.starts_with("footnote") || target.starts_with("note")) {
        return None;
    }
    ANCHOR_LABEL.captures(target).map(|caps| normalize_label(&caps[1]))
}

/// Label and remaining text of a block that opens with a marker.
///
/// A leading `Inline::Marker` (from a `<sup>`) counts as well as a textual one.
pub fn leading_marker(block: &Block) -> Option<(String, String)> {
    if let Some(Inline::Marker(label)) = block.inlines.first() {
        let rest: String = block.inlines[1..].iter().map(inline_text).collect();
        return Some((label.clone(), clean_text(&rest)));
    }

    let text = block.display_text();
    let caps = LEADING_MARKER.captures(&text)?;
    let label = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
    Some((normalize_label(label.as_str()), clean_text(rest)))
}

/// Whether a heading introduces the notes section.
pub fn is_notes_heading(text: &str) -> bool {
    let text = clean_text(text).to_lowercase();
    let text = text.trim_end_matches(':').trim();
    NOTES_HEADINGS.contains(&text)
}

/// Splits `(n)` / `[n]` tokens out of text runs into markers.
///
/// Only tokens whose label passes `accept` become markers; the rest stay as text.
pub fn split_text_markers(inlines: Vec<Inline>, accept: impl Fn(&str) -> bool) -> Vec<Inline> {
    let mut out = Vec::with_capacity(inlines.len());

    for inline in inlines {
        let Inline::Text(text) = inline else {
            out.push(inline);
            continue;
        };

        let mut cursor = 0;
        for caps in INLINE_MARKER.captures_iter(&text) {
            let (Some(whole), Some(label)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
                continue;
            };
            let label = normalize_label(label.as_str());
            if !accept(&label) {
                continue;
            }
            if whole.start() > cursor {
                out.push(Inline::Text(text[cursor..whole.start()].to_string()));
            }
            out.push(Inline::Marker(label));
            cursor = whole.end();
        }

        if cursor < text.len() {
            out.push(Inline::Text(text[cursor..].to_string()));
        }
    }

    out
}

fn inline_text(inline: &Inline) -> &str {
    match inline {
        Inline::Text(text) => text,
        Inline::Marker(_) => "",
    }
}

/// `"01"` and `"1"` are the same marker.
fn normalize_label(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}
