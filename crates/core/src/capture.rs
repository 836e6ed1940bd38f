//! Normalized capture model.
//!
//! A [`NormalizedCapture`] is what the versioner compares and the store
//! persists: noise stripped, whitespace canonical, footnotes numbered
//! `1..N` by first appearance and images numbered `1..N` in document order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::document::BlockKind;

/// A body block in canonical form. Footnote markers appear in `text` as `[^n]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBlock {
    pub kind: BlockKind,
    pub text: String,
    /// 1-based position inside its source list, for list items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_position: Option<u32>,
}

impl NormalizedBlock {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), list_position: None }
    }
}

/// A footnote after renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFootnote {
    /// Position in first-appearance order, from 1.
    pub number: u32,
    /// The label the source used.
    pub marker: String,
    pub text: String,
}

/// An image occurrence with its document-order index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedImage {
    pub index: u32,
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCapture {
    pub source_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub title: Option<String>,
    pub published: Option<String>,
    pub blocks: Vec<NormalizedBlock>,
    /// Footnotes in first-appearance order.
    pub footnotes: Vec<NormalizedFootnote>,
    /// Images in document order, repeats included.
    pub images: Vec<IndexedImage>,
}

impl NormalizedCapture {
    /// Whether both captures carry the same body and footnote text.
    ///
    /// Timestamps, title, images and the source's own footnote labels are ignored.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
            && self.footnotes.len() == other.footnotes.len()
            && self.footnotes.iter().zip(&other.footnotes).all(|(a, b)| a.number == b.number && a.text == b.text)
    }

    /// SHA-256 (hex) of the canonical body and footnote text.
    ///
    /// Equal content always yields equal digests; stores may use it as a
    /// cheap pre-check before [`content_eq`](Self::content_eq).
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for block in &self.blocks {
            hasher.update(kind_tag(block.kind).as_bytes());
            hasher.update([0x1f]);
            hasher.update(block.text.as_bytes());
            hasher.update([0x1e]);
        }
        hasher.update([0x1d]);
        for footnote in &self.footnotes {
            hasher.update(footnote.number.to_string().as_bytes());
            hasher.update([0x1f]);
            hasher.update(footnote.text.as_bytes());
            hasher.update([0x1e]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

fn kind_tag(kind: BlockKind) -> String {
    match kind {
        BlockKind::Heading { level } => format!("h{level}"),
        BlockKind::Paragraph => "p".to_string(),
        BlockKind::Quotation => "q".to_string(),
        BlockKind::ListItem { ordered: true } => "ol".to_string(),
        BlockKind::ListItem { ordered: false } => "ul".to_string(),
    }
}
