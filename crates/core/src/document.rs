//! Extractor output: the structured form of one fetched page.
//!
//! A [`SourceDocument`] still carries everything the page had, including the
//! blocks judged to be site chrome (kept apart in `navigation_noise`) and the
//! footnote markers under their original labels.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One fetch as handed over by the external fetcher.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// URL the markup was fetched from.
    pub source_url: String,
    /// Undecoded response body.
    pub raw_markup: Vec<u8>,
    /// When the fetch completed.
    pub fetched_at: OffsetDateTime,
}

impl RawPage {
    pub fn new(source_url: impl Into<String>, raw_markup: impl Into<Vec<u8>>, fetched_at: OffsetDateTime) -> Self {
        Self { source_url: source_url.into(), raw_markup: raw_markup.into(), fetched_at }
    }

    /// Creates a page stamped with the current UTC time.
    pub fn now(source_url: impl Into<String>, raw_markup: impl Into<Vec<u8>>) -> Self {
        Self::new(source_url, raw_markup, OffsetDateTime::now_utc())
    }
}

/// The structural role of a body block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// `h2`..`h6`; the page title is carried separately.
    Heading { level: u8 },
    Paragraph,
    Quotation,
    ListItem { ordered: bool },
}

/// A run of text or a footnote marker inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    /// Footnote marker under its source label ("1", "12", ...).
    Marker(String),
}

/// Structural facts recorded about where a block came from.
///
/// The extractor only records these; deciding what counts as chrome is left
/// to a [`NoiseClassifier`](crate::noise::NoiseClassifier).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockOrigin {
    /// Tag the block was built from (`p`, `li`, `blockquote`, `h3`, ...).
    pub tag: String,
    /// Nearest landmark ancestor (`nav`, `header`, `footer`, `aside`, `form`).
    pub landmark: Option<String>,
    /// Lowercased class and id tokens of the element and its ancestors.
    pub class_tokens: Vec<String>,
    /// Ratio of link text to all text.
    pub link_density: f64,
    /// Whether the block sits in a recognized footnote list.
    pub in_footnote_list: bool,
    /// 1-based position inside its list, for list items.
    pub list_position: Option<u32>,
}

/// A typed text segment of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub inlines: Vec<Inline>,
    pub origin: BlockOrigin,
}

impl Block {
    pub fn new(kind: BlockKind, inlines: Vec<Inline>, origin: BlockOrigin) -> Self {
        Self { kind, inlines, origin }
    }

    /// Text of the block with markers left out.
    pub fn plain_text(&self) -> String {
        self.inlines
            .iter()
            .filter_map(|inline| match inline {
                Inline::Text(text) => Some(text.as_str()),
                Inline::Marker(_) => None,
            })
            .collect()
    }

    /// Text of the block with markers written back as `(label)`.
    pub fn display_text(&self) -> String {
        let mut out = String::new();
        for inline in &self.inlines {
            match inline {
                Inline::Text(text) => out.push_str(text),
                Inline::Marker(label) => {
                    out.push('(');
                    out.push_str(label);
                    out.push(')');
                }
            }
        }
        out
    }

    /// Marker labels in order of appearance.
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.inlines.iter().filter_map(|inline| match inline {
            Inline::Marker(label) => Some(label.as_str()),
            Inline::Text(_) => None,
        })
    }

    pub fn has_markers(&self) -> bool {
        self.markers().next().is_some()
    }
}

/// A footnote text under the label the source gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    pub marker: String,
    pub text: String,
}

/// An image found in the article body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Absolute image URL.
    pub url: String,
    pub alt: Option<String>,
}

/// Everything the extractor learned from one fetch.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_url: String,
    pub fetched_at: OffsetDateTime,
    pub title: Option<String>,
    /// Publication date as the page states it.
    pub published: Option<String>,
    /// Body blocks in document order.
    pub body_blocks: Vec<Block>,
    /// Footnote texts in order of first appearance.
    pub footnotes: Vec<Footnote>,
    /// Body images in document order, repeats included.
    pub image_refs: Vec<ImageRef>,
    /// Blocks recognized as site chrome.
    pub navigation_noise: Vec<Block>,
}
