use crate::capture::NormalizedBlock;
use crate::document::BlockKind;
use crate::snapshot::{Snapshot, iso_timestamp};

/// Heading used when a page has no detectable title
pub const FALLBACK_TITLE: &str = "Artículo";

/// Configuration for artifact rendering
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Append the renumbered footnote list after the body
    pub include_footnotes: bool,
    /// Append the `## Imágenes` section listing local image paths
    pub include_images: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { include_footnotes: true, include_images: true }
    }
}

/// Render a snapshot as the markdown artifact with the default configuration
pub fn render_markdown(snapshot: &Snapshot) -> String {
    MarkdownFormatter::default().render(snapshot)
}

/// `<host>_<YYYYMMDD_HHMMSS>v<version>.md`
pub fn artifact_file_name(snapshot: &Snapshot) -> String {
    format!("{}.md", snapshot.file_stem())
}

fn render_header(snapshot: &Snapshot, out: &mut String) {
    let content = &snapshot.content;
    let title = content.title.as_deref().unwrap_or(FALLBACK_TITLE);

    out.push_str(&format!("# {title}\n\n"));
    out.push_str(&format!("- Fuente: {}\n", snapshot.source_url));
    if let Some(published) = &content.published {
        out.push_str(&format!("- Fecha detectada: {published}\n"));
    }
    out.push_str(&format!("- Extraído: {}\n", iso_timestamp(snapshot.extracted_at)));
    if snapshot.image_count() > 0 {
        out.push_str(&format!("- Imágenes detectadas: {}\n", snapshot.image_count()));
    }
    out.push_str("\n---\n\n");
}

/// Body blocks, lists kept tight and everything else separated by a blank line
fn render_body(blocks: &[NormalizedBlock]) -> String {
    let mut out = String::new();
    let mut ordinal = 0;
    let mut previous: Option<BlockKind> = None;

    for block in blocks {
        let is_item = matches!(block.kind, BlockKind::ListItem { .. });
        let follows_item = matches!(previous, Some(BlockKind::ListItem { .. }));
        let same_kind = previous == Some(block.kind);
        let same_list = is_item && follows_item && (same_kind || block.list_position.is_some_and(|p| p > 1));
        ordinal = match block.list_position {
            Some(position) => position,
            None if is_item && same_kind => ordinal + 1,
            None => 1,
        };

        if previous.is_some() {
            out.push_str(if same_list { "\n" } else { "\n\n" });
        }

        match block.kind {
            BlockKind::Heading { level } => {
                out.push_str(&"#".repeat(level.clamp(2, 6) as usize));
                out.push(' ');
                out.push_str(&block.text);
            }
            BlockKind::Paragraph => out.push_str(&block.text),
            BlockKind::Quotation => {
                out.push_str("> ");
                out.push_str(&block.text);
            }
            BlockKind::ListItem { ordered: false } => {
                out.push_str("- ");
                out.push_str(&block.text);
            }
            BlockKind::ListItem { ordered: true } => out.push_str(&format!("{ordinal}. {}", block.text)),
        }

        previous = Some(block.kind);
    }

    out
}

/// Markdown formatter with configurable sections
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    config: MarkdownConfig,
}

impl MarkdownFormatter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, snapshot: &Snapshot) -> String {
        let content = &snapshot.content;
        let mut out = String::new();

        render_header(snapshot, &mut out);
        out.push_str(&render_body(&content.blocks));

        if self.config.include_footnotes && !content.footnotes.is_empty() {
            out.push_str("\n\n");
            let notes: Vec<String> =
                content.footnotes.iter().map(|f| format!("[^{}]: {}", f.number, f.text)).collect();
            out.push_str(&notes.join("\n"));
        }

        if self.config.include_images && !snapshot.image_manifest.is_empty() {
            out.push_str("\n\n---\n\n## Imágenes\n\n");
            let lines: Vec<String> = snapshot
                .image_manifest
                .iter()
                .map(|entry| {
                    let alt = content
                        .images
                        .iter()
                        .find(|image| image.index == entry.index)
                        .and_then(|image| image.alt.clone())
                        .unwrap_or_else(|| format!("imagen {}", entry.index));
                    format!("![{alt}]({})", entry.local_path)
                })
                .collect();
            out.push_str(&lines.join("\n"));
        }

        format!("{}\n", out.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{IndexedImage, NormalizedCapture, NormalizedFootnote};
    use crate::snapshot::ImageManifestEntry;
    use time::macros::datetime;

    fn block(kind: BlockKind, text: &str) -> NormalizedBlock {
        NormalizedBlock::new(kind, text)
    }

    fn item(ordered: bool, position: u32, text: &str) -> NormalizedBlock {
        NormalizedBlock { list_position: Some(position), ..NormalizedBlock::new(BlockKind::ListItem { ordered }, text) }
    }

    fn snapshot(blocks: Vec<NormalizedBlock>) -> Snapshot {
        Snapshot {
            source_url: "https://aemetblog.es/2026/02/12/engelamiento/".to_string(),
            version: 1,
            captured_at: datetime!(2026-02-12 10:15:00 UTC),
            extracted_at: datetime!(2026-02-12 10:15:30 UTC),
            content: NormalizedCapture {
                source_url: "https://aemetblog.es/2026/02/12/engelamiento/".to_string(),
                fetched_at: datetime!(2026-02-12 10:15:00 UTC),
                title: Some("Engelamiento".to_string()),
                published: None,
                blocks,
                footnotes: Vec::new(),
                images: Vec::new(),
            },
            image_manifest: Vec::new(),
        }
    }

    #[test]
    fn test_minimal_artifact() {
        let mut snap = snapshot(vec![block(BlockKind::Paragraph, "Hielo en el ala[^1].")]);
        snap.content.footnotes =
            vec![NormalizedFootnote { number: 1, marker: "1".to_string(), text: "Término de 1948.".to_string() }];

        let expected = "# Engelamiento\n\n\
            - Fuente: https://aemetblog.es/2026/02/12/engelamiento/\n\
            - Extraído: 2026-02-12T10:15:30Z\n\n\
            ---\n\n\
            Hielo en el ala[^1].\n\n\
            [^1]: Término de 1948.\n";
        assert_eq!(render_markdown(&snap), expected);
    }

    #[test]
    fn test_header_with_date_and_images() {
        let mut snap = snapshot(vec![block(BlockKind::Paragraph, "Hielo")]);
        snap.content.published = Some("2026-02-12T08:00:00+00:00".to_string());
        snap.content.images = vec![
            IndexedImage { index: 1, url: "https://aemetblog.es/a.jpg".into(), alt: Some("Ala con hielo".into()) },
            IndexedImage { index: 2, url: "https://aemetblog.es/b.png".into(), alt: None },
        ];
        snap.image_manifest = vec![
            ImageManifestEntry {
                index: 1,
                local_path: "assets/x/img_001.jpg".into(),
                original_url: "https://aemetblog.es/a.jpg".into(),
            },
            ImageManifestEntry {
                index: 2,
                local_path: "assets/x/img_002.png".into(),
                original_url: "https://aemetblog.es/b.png".into(),
            },
        ];

        let md = render_markdown(&snap);
        assert!(md.contains("- Fecha detectada: 2026-02-12T08:00:00+00:00\n- Extraído:"));
        assert!(md.contains("- Imágenes detectadas: 2\n"));
        assert!(md.ends_with("## Imágenes\n\n![Ala con hielo](assets/x/img_001.jpg)\n![imagen 2](assets/x/img_002.png)\n"));
    }

    #[test]
    fn test_block_kinds() {
        let snap = snapshot(vec![
            block(BlockKind::Heading { level: 2 }, "Origen"),
            block(BlockKind::Quotation, "Cita"),
            block(BlockKind::ListItem { ordered: true }, "uno"),
            block(BlockKind::ListItem { ordered: true }, "dos"),
            block(BlockKind::ListItem { ordered: false }, "suelto"),
            block(BlockKind::Heading { level: 3 }, "Detalle"),
        ]);
        let md = render_markdown(&snap);
        assert!(md.contains("## Origen\n\n> Cita\n\n1. uno\n2. dos\n\n- suelto\n\n### Detalle\n"));
    }

    #[test]
    fn test_nested_items_keep_outer_numbering() {
        let snap = snapshot(vec![
            item(true, 1, "formación"),
            item(false, 1, "gotas subfundidas"),
            item(false, 2, "cristales"),
            item(true, 2, "acumulación"),
            item(true, 3, "desprendimiento"),
        ]);
        let md = render_markdown(&snap);
        assert!(md.contains("1. formación\n\n- gotas subfundidas\n- cristales\n2. acumulación\n3. desprendimiento\n"));
    }

    #[test]
    fn test_title_fallback_and_file_name() {
        let mut snap = snapshot(vec![block(BlockKind::Paragraph, "Hielo")]);
        snap.content.title = None;
        snap.source_url = "https://www.aemetblog.es/x/".to_string();
        snap.version = 2;

        assert!(render_markdown(&snap).starts_with("# Artículo\n"));
        assert_eq!(artifact_file_name(&snap), "aemetblog.es_20260212_101530v2.md");
    }

    #[test]
    fn test_sections_can_be_disabled() {
        let mut snap = snapshot(vec![block(BlockKind::Paragraph, "Hielo[^1]")]);
        snap.content.footnotes = vec![NormalizedFootnote { number: 1, marker: "1".into(), text: "Nota".into() }];

        let formatter = MarkdownFormatter::new(MarkdownConfig { include_footnotes: false, include_images: false });
        assert!(!formatter.render(&snap).contains("[^1]: Nota"));
    }
}
