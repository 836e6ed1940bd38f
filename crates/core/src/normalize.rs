use std::collections::HashMap;

use crate::capture::{IndexedImage, NormalizedBlock, NormalizedCapture, NormalizedFootnote};
use crate::document::{Block, Inline, SourceDocument};
use crate::metadata::clean_text;
use crate::{EstelaError, Result};

/// Canonicalizes an extracted document.
///
/// Navigation noise is dropped, whitespace collapsed and footnotes
/// renumbered by first appearance in the body. Repeated paragraphs inside
/// one document are kept as they are.
///
/// # Errors
///
/// Returns a normalization error when a body marker has no footnote text,
/// a footnote text is never referenced, or a label is defined twice.
pub fn normalize(doc: SourceDocument) -> Result<NormalizedCapture> {
    let definitions = index_definitions(&doc)?;

    let mut numbering: HashMap<String, u32> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut blocks = Vec::with_capacity(doc.body_blocks.len());

    for block in &doc.body_blocks {
        let text = render_block(block, |label| {
            if let Some(number) = numbering.get(label) {
                return *number;
            }
            order.push(label.to_string());
            let number = order.len() as u32;
            numbering.insert(label.to_string(), number);
            number
        });

        if !text.is_empty() {
            blocks.push(NormalizedBlock { kind: block.kind, text, list_position: block.origin.list_position });
        }
    }

    if let Some(dangling) = order.iter().find(|label| !definitions.contains_key(label.as_str())) {
        return Err(EstelaError::DanglingFootnoteMarker { marker: dangling.clone() });
    }

    if let Some(orphan) = doc.footnotes.iter().find(|f| !numbering.contains_key(&f.marker)) {
        return Err(EstelaError::OrphanFootnote { marker: orphan.marker.clone() });
    }

    let footnotes = order
        .into_iter()
        .enumerate()
        .map(|(position, marker)| {
            let text = definitions.get(marker.as_str()).map(|t| clean_text(t)).unwrap_or_default();
            NormalizedFootnote { number: position as u32 + 1, marker, text }
        })
        .collect();

    let images = doc
        .image_refs
        .into_iter()
        .enumerate()
        .map(|(position, image)| IndexedImage { index: position as u32 + 1, url: image.url, alt: image.alt })
        .collect();

    Ok(NormalizedCapture {
        source_url: doc.source_url,
        fetched_at: doc.fetched_at,
        title: doc.title.map(|t| clean_text(&t)).filter(|t| !t.is_empty()),
        published: doc.published,
        blocks,
        footnotes,
        images,
    })
}

fn index_definitions(doc: &SourceDocument) -> Result<HashMap<&str, &str>> {
    let mut definitions = HashMap::with_capacity(doc.footnotes.len());
    for footnote in &doc.footnotes {
        if definitions.insert(footnote.marker.as_str(), footnote.text.as_str()).is_some() {
            return Err(EstelaError::DuplicateFootnote { marker: footnote.marker.clone() });
        }
    }
    Ok(definitions)
}

/// Collapsed block text with each marker written as `[^n]` right after the preceding word
fn render_block(block: &Block, mut number_for: impl FnMut(&str) -> u32) -> String {
    let mut raw = String::new();
    for inline in &block.inlines {
        match inline {
            Inline::Text(text) => raw.push_str(text),
            Inline::Marker(label) => {
                let trimmed = raw.trim_end().len();
                raw.truncate(trimmed);
                raw.push_str(&format!("[^{}]", number_for(label)));
            }
        }
    }
    clean_text(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockKind, BlockOrigin, Footnote, ImageRef};
    use time::macros::datetime;

    fn para(inlines: Vec<Inline>) -> Block {
        Block::new(BlockKind::Paragraph, inlines, BlockOrigin::default())
    }

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn marker(s: &str) -> Inline {
        Inline::Marker(s.to_string())
    }

    fn note(marker: &str, text: &str) -> Footnote {
        Footnote { marker: marker.to_string(), text: text.to_string() }
    }

    fn document(body: Vec<Block>, footnotes: Vec<Footnote>) -> SourceDocument {
        SourceDocument {
            source_url: "https://aemetblog.es/engelamiento/".to_string(),
            fetched_at: datetime!(2026-02-12 10:15:00 UTC),
            title: Some("  Engelamiento\u{a0}aeronáutico ".to_string()),
            published: None,
            body_blocks: body,
            footnotes,
            image_refs: Vec::new(),
            navigation_noise: vec![para(vec![text("Comparte esto:")])],
        }
    }

    #[test]
    fn test_whitespace_and_noise() {
        let doc = document(
            vec![para(vec![text("  Hielo \n\n  en\u{a0}las   alas ")]), para(vec![text(" \n ")])],
            Vec::new(),
        );
        let capture = normalize(doc).unwrap();

        assert_eq!(capture.blocks.len(), 1);
        assert_eq!(capture.blocks[0].text, "Hielo en las alas");
        assert_eq!(capture.title.as_deref(), Some("Engelamiento aeronáutico"));
    }

    #[test]
    fn test_renumbers_by_first_appearance() {
        let doc = document(
            vec![
                para(vec![text("Primero "), marker("3"), text(" luego "), marker("1")]),
                para(vec![text("Al final "), marker("2"), text(" y de nuevo "), marker("3")]),
            ],
            vec![note("1", "Nota uno"), note("2", "Nota dos"), note("3", "Nota tres")],
        );
        let capture = normalize(doc).unwrap();

        assert_eq!(capture.blocks[0].text, "Primero[^1] luego[^2]");
        assert_eq!(capture.blocks[1].text, "Al final[^3] y de nuevo[^1]");
        let notes: Vec<(u32, &str, &str)> =
            capture.footnotes.iter().map(|f| (f.number, f.marker.as_str(), f.text.as_str())).collect();
        assert_eq!(notes, vec![(1, "3", "Nota tres"), (2, "1", "Nota uno"), (3, "2", "Nota dos")]);
    }

    #[test]
    fn test_dangling_marker() {
        let doc = document(vec![para(vec![text("Hielo"), marker("1"), marker("2")])], vec![note("1", "Nota")]);
        let result = normalize(doc);
        assert!(matches!(result, Err(EstelaError::DanglingFootnoteMarker { marker }) if marker == "2"));
    }

    #[test]
    fn test_orphan_footnote() {
        let doc = document(vec![para(vec![text("Hielo"), marker("1")])], vec![note("1", "Uno"), note("4", "Cuatro")]);
        let result = normalize(doc);
        assert!(matches!(result, Err(EstelaError::OrphanFootnote { marker }) if marker == "4"));
    }

    #[test]
    fn test_duplicate_definition() {
        let doc = document(vec![para(vec![text("Hielo"), marker("1")])], vec![note("1", "Uno"), note("1", "Otra")]);
        let result = normalize(doc);
        assert!(matches!(result, Err(EstelaError::DuplicateFootnote { .. })));
    }

    #[test]
    fn test_repeated_paragraphs_are_kept() {
        let block = para(vec![text("El piloto notó hielo en el borde de ataque.")]);
        let mut quote = block.clone();
        quote.kind = BlockKind::Quotation;
        let doc = document(vec![quote, block], Vec::new());

        let capture = normalize(doc).unwrap();
        assert_eq!(capture.blocks.len(), 2);
        assert_eq!(capture.blocks[0].text, capture.blocks[1].text);
    }

    #[test]
    fn test_image_indices_include_repeats() {
        let mut doc = document(vec![para(vec![text("Hielo")])], Vec::new());
        doc.image_refs = vec![
            ImageRef { url: "https://aemetblog.es/a.jpg".into(), alt: None },
            ImageRef { url: "https://aemetblog.es/b.jpg".into(), alt: Some("Ala".into()) },
            ImageRef { url: "https://aemetblog.es/a.jpg".into(), alt: None },
        ];
        let capture = normalize(doc).unwrap();

        let indexed: Vec<(u32, &str)> = capture.images.iter().map(|i| (i.index, i.url.as_str())).collect();
        assert_eq!(
            indexed,
            vec![(1, "https://aemetblog.es/a.jpg"), (2, "https://aemetblog.es/b.jpg"), (3, "https://aemetblog.es/a.jpg")]
        );
    }

    #[test]
    fn test_idempotent() {
        let build = || {
            document(
                vec![para(vec![text("Hielo  (ver) "), marker("1")])],
                vec![note("1", " Nota\u{a0}uno ")],
            )
        };
        let a = normalize(build()).unwrap();
        let b = normalize(build()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.footnotes[0].text, "Nota uno");
    }

    #[test]
    fn test_list_position_is_carried() {
        let item = Block::new(
            BlockKind::ListItem { ordered: true },
            vec![text("acumulación")],
            BlockOrigin { list_position: Some(2), ..Default::default() },
        );
        let capture = normalize(document(vec![item], vec![])).unwrap();

        assert_eq!(capture.blocks[0].list_position, Some(2));
    }
}
