use std::collections::{HashMap, HashSet};

use scraper::ElementRef;
use tracing::debug;
use url::Url;

use crate::config::{PipelineConfig, SiteProfile};
use crate::document::{Block, BlockKind, BlockOrigin, Footnote, ImageRef, Inline, RawPage, SourceDocument};
use crate::footnotes;
use crate::metadata::clean_text;
use crate::noise::{BoilerplateClassifier, NoiseClassifier};
use crate::parse::{Document, Element};
use crate::scoring::{container_score, link_density};
use crate::{EstelaError, Result};

/// Landmark tags recorded on blocks so the classifier can route them
const LANDMARK_TAGS: &[&str] = &["nav", "header", "footer", "aside", "form"];

/// Tags whose boundaries separate words when their text is flattened
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "li", "ul", "ol", "blockquote", "figure", "figcaption", "h1", "h2", "h3", "h4", "h5", "h6",
    "table", "tr", "td", "th",
];

const DATA_URI_PREFIX: &str = "data:";

/// Where the structural walk currently is
#[derive(Debug, Clone, Default)]
struct Context {
    landmark: Option<String>,
    class_tokens: Vec<String>,
    in_footnotes: bool,
}

impl Context {
    fn enter(&self, element: &Element<'_>) -> Self {
        let tag = element.tag_name();
        let mut class_tokens = self.class_tokens.clone();
        class_tokens.extend(element.class_tokens());

        let landmark = if LANDMARK_TAGS.contains(&tag.as_str()) { Some(tag) } else { self.landmark.clone() };

        Self { landmark, class_tokens, in_footnotes: self.in_footnotes || is_footnote_container(element) }
    }
}

/// Turns raw markup into a [`SourceDocument`].
///
/// The extractor is pure: it holds only configuration and may be shared
/// across threads.
pub struct Extractor {
    config: PipelineConfig,
    classifier: Option<Box<dyn NoiseClassifier>>,
}

impl Extractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self { config: config.clone(), classifier: None }
    }

    /// Replaces the configured [`BoilerplateClassifier`] with a custom one.
    pub fn with_classifier(mut self, classifier: impl NoiseClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Extracts one page.
    ///
    /// # Errors
    ///
    /// Fails with an extraction error when the URL is invalid, the markup is
    /// not UTF-8, the page looks like an error page or no body block survives.
    pub fn extract(&self, page: &RawPage) -> Result<SourceDocument> {
        let url =
            Url::parse(&page.source_url).map_err(|e| EstelaError::InvalidUrl(format!("{}: {e}", page.source_url)))?;

        let markup = std::str::from_utf8(&page.raw_markup).map_err(|_| EstelaError::InvalidEncoding)?;
        let markup = markup.strip_prefix('\u{feff}').unwrap_or(markup);

        let doc = Document::parse_with_preprocessing(markup, Some(url.clone()))?;
        let metadata = doc.extract_metadata();

        let site = self.config.site(url.host_str().unwrap_or_default());
        let container = self.choose_container(&doc, site)?;

        let mut walk = Walk::with_title(metadata.title.as_deref());
        walk.element(container, &Context::default());

        let mut navigation_noise = landmarks_outside(&doc, &container);
        let (body_blocks, footnotes, mut noise) = self.route(walk.blocks, site);
        navigation_noise.append(&mut noise);

        debug!(
            source_url = %page.source_url,
            body = body_blocks.len(),
            noise = navigation_noise.len(),
            footnotes = footnotes.len(),
            "extractor.routed"
        );

        self.check_error_page(&page.source_url, metadata.title.as_deref(), &body_blocks)?;

        if body_blocks.is_empty() {
            return Err(EstelaError::NoArticleBody { url: page.source_url.clone() });
        }

        Ok(SourceDocument {
            source_url: page.source_url.clone(),
            fetched_at: page.fetched_at,
            title: metadata.title,
            published: metadata.published,
            body_blocks,
            footnotes,
            image_refs: self.images(&container),
            navigation_noise,
        })
    }

    /// Site selector, then configured selectors, then the best scoring `div`/`section`, then `<body>`
    fn choose_container<'d>(&self, doc: &'d Document, site: Option<&SiteProfile>) -> Result<Element<'d>> {
        let configured = site.and_then(|s| s.body_selector.as_deref()).into_iter();
        for selector in configured.chain(self.config.extractor.body_selectors.iter().map(String::as_str)) {
            if let Some(element) = doc.select_first(selector)? {
                debug!(selector, "extractor.container");
                return Ok(element);
            }
        }

        let best = doc
            .select("div, section")?
            .into_iter()
            .map(|element| (container_score(&element), element))
            .filter(|(score, _)| *score > 0.0)
            .fold(None::<(f64, Element<'d>)>, |best, candidate| match best {
                Some(current) if current.0 >= candidate.0 => Some(current),
                _ => Some(candidate),
            });

        match best {
            Some((score, element)) => {
                debug!(score, tag = %element.tag_name(), "extractor.container.scored");
                Ok(element)
            }
            None => {
                debug!("extractor.container.body");
                Ok(doc.body())
            }
        }
    }

    /// Splits walked blocks into body, footnote definitions and noise
    fn route(&self, blocks: Vec<Block>, site: Option<&SiteProfile>) -> (Vec<Block>, Vec<Footnote>, Vec<Block>) {
        let fallback;
        let classifier: &dyn NoiseClassifier = match (&self.classifier, site) {
            (Some(custom), _) => &**custom,
            (None, Some(site)) => {
                fallback = BoilerplateClassifier::for_site(&self.config.noise, site);
                &fallback
            }
            (None, None) => {
                fallback = BoilerplateClassifier::new(&self.config.noise);
                &fallback
            }
        };

        let definition_slots = find_definitions(&blocks, classifier);
        let textual = textual_labels(&blocks, &definition_slots);
        let mut footnotes = Vec::new();
        let mut body = Vec::new();
        let mut noise = Vec::new();

        for (index, mut block) in blocks.into_iter().enumerate() {
            match definition_slots.get(&index) {
                Some(Slot::Definition(marker, text)) => {
                    footnotes.push(Footnote { marker: marker.clone(), text: text.clone() })
                }
                Some(Slot::NotesHeading) => {}
                None => {
                    // Markers are split before classification so a short referencing
                    // paragraph is not taken for a fragment.
                    block.inlines =
                        footnotes::split_text_markers(std::mem::take(&mut block.inlines), |l| textual.contains(l));
                    if classifier.is_noise(&block) {
                        noise.push(block);
                    } else {
                        body.push(block);
                    }
                }
            }
        }

        (body, footnotes, noise)
    }

    fn check_error_page(&self, url: &str, title: Option<&str>, body: &[Block]) -> Result<()> {
        let first_heading = body.iter().find(|b| matches!(b.kind, BlockKind::Heading { .. })).map(Block::plain_text);
        let paragraphs = body.iter().filter(|b| b.kind == BlockKind::Paragraph).count();
        if paragraphs >= 2 {
            return Ok(());
        }

        for candidate in title.map(str::to_string).into_iter().chain(first_heading) {
            let lowered = candidate.to_lowercase();
            if let Some(marker) =
                self.config.extractor.error_page_markers.iter().find(|m| lowered.contains(m.to_lowercase().as_str()))
            {
                return Err(EstelaError::ErrorPage {
                    url: url.to_string(),
                    reason: format!("{candidate:?} matches {marker:?}"),
                });
            }
        }

        Ok(())
    }

    /// Images inside the container, outside landmark chrome
    fn images(&self, container: &Element<'_>) -> Vec<ImageRef> {
        let chrome: Vec<&str> = self.config.noise.chrome_tags.iter().map(String::as_str).collect();
        container
            .select("img")
            .unwrap_or_default()
            .into_iter()
            .filter(|img| !img.has_ancestor_tag(&chrome))
            .filter_map(|img| {
                let url = img.attr("src")?.trim();
                if url.is_empty() || url.starts_with(DATA_URI_PREFIX) {
                    return None;
                }
                let alt = img.attr("alt").map(clean_text).filter(|alt| !alt.is_empty());
                Some(ImageRef { url: url.to_string(), alt })
            })
            .collect()
    }
}

/// What a walked block turned out to be, besides body or noise
enum Slot {
    Definition(String, String),
    NotesHeading,
}

/// Locates footnote definitions by container, notes heading and trailing marker-led run.
fn find_definitions(blocks: &[Block], classifier: &dyn NoiseClassifier) -> HashMap<usize, Slot> {
    let mut slots = HashMap::new();

    for (index, block) in blocks.iter().enumerate() {
        if block.origin.in_footnote_list
            && let Some(definition) = container_definition(block)
        {
            slots.insert(index, definition);
        }
    }

    let notes_heading = blocks.iter().position(|b| {
        matches!(b.kind, BlockKind::Heading { .. })
            && b.origin.landmark.is_none()
            && footnotes::is_notes_heading(&b.plain_text())
    });

    let body_end = match notes_heading {
        Some(heading) => {
            slots.insert(heading, Slot::NotesHeading);
            for (index, block) in blocks.iter().enumerate().skip(heading + 1) {
                if block.origin.landmark.is_some() || slots.contains_key(&index) {
                    continue;
                }
                if let Some((marker, text)) = footnotes::leading_marker(block) {
                    slots.insert(index, Slot::Definition(marker, text));
                } else if let (BlockKind::ListItem { ordered: true }, Some(position)) =
                    (block.kind, block.origin.list_position)
                {
                    slots.insert(index, Slot::Definition(position.to_string(), clean_text(&block.plain_text())));
                }
            }
            heading
        }
        None => blocks.len(),
    };

    trailing_run(blocks, body_end, classifier, &mut slots);
    slots
}

/// Defined labels that textual `(n)` / `[n]` tokens may claim.
///
/// A label already referenced by a `<sup>` or anchor marker belongs to that marker.
fn textual_labels(blocks: &[Block], slots: &HashMap<usize, Slot>) -> HashSet<String> {
    let structural: HashSet<&str> = blocks
        .iter()
        .enumerate()
        .filter(|(index, _)| !slots.contains_key(index))
        .flat_map(|(_, block)| block.markers())
        .collect();

    slots
        .values()
        .filter_map(|slot| match slot {
            Slot::Definition(marker, _) if !structural.contains(marker.as_str()) => Some(marker.clone()),
            _ => None,
        })
        .collect()
}

fn container_definition(block: &Block) -> Option<Slot> {
    if let Some((marker, text)) = footnotes::leading_marker(block) {
        return Some(Slot::Definition(marker, text));
    }

    let from_id = block.origin.class_tokens.iter().rev().find_map(|token| footnotes::anchor_label(&format!("#{token}")));
    let marker = from_id.or_else(|| block.origin.list_position.map(|p| p.to_string()))?;
    Some(Slot::Definition(marker, clean_text(&block.plain_text())))
}

/// The run of marker-led blocks closing the body, accepted only for labels the body references.
///
/// References held only by noise blocks do not count. Chrome after the notes (share prompts and the like) does not end the run.
fn trailing_run(blocks: &[Block], end: usize, classifier: &dyn NoiseClassifier, slots: &mut HashMap<usize, Slot>) {
    let mut run = Vec::new();
    for index in (0..end).rev() {
        let block = &blocks[index];
        if slots.contains_key(&index) || block.origin.landmark.is_some() {
            continue;
        }
        match footnotes::leading_marker(block) {
            Some((marker, text)) if !matches!(block.kind, BlockKind::Heading { .. }) => run.push((index, marker, text)),
            _ if run.is_empty() && classifier.is_noise(block) => continue,
            _ => break,
        }
    }

    if run.is_empty() {
        return;
    }

    let run_start = run.iter().map(|(index, _, _)| *index).min().unwrap_or(end);
    let referenced: HashSet<String> = blocks[..run_start]
        .iter()
        .filter(|b| b.origin.landmark.is_none())
        .map(|b| Block::new(b.kind, footnotes::split_text_markers(b.inlines.clone(), |_| true), b.origin.clone()))
        .filter(|b| !classifier.is_noise(b))
        .flat_map(|b| b.inlines)
        .filter_map(|inline| match inline {
            Inline::Marker(label) => Some(label),
            Inline::Text(_) => None,
        })
        .collect();

    for (index, marker, text) in run {
        if referenced.contains(&marker) {
            slots.insert(index, Slot::Definition(marker, text));
        }
    }
}

fn is_footnote_container(element: &Element<'_>) -> bool {
    if element.attr("role") == Some("doc-endnotes") {
        return true;
    }
    let tokens = element.class_tokens();
    if tokens.iter().any(|t| t == "footnotes" || t == "footnote" || t == "notes") {
        return true;
    }
    element.tag_name() == "li" && element.attr("id").is_some_and(|id| id.starts_with("fn"))
}

/// Landmark chrome that sits outside the chosen container, walked straight into noise
fn landmarks_outside(doc: &Document, container: &Element<'_>) -> Vec<Block> {
    let Ok(landmarks) = doc.select("nav, header, footer, aside") else {
        return Vec::new();
    };

    let mut walk = Walk::default();
    for landmark in landmarks {
        if landmark.is_descendant_of(container)
            || container.is_descendant_of(&landmark)
            || landmark.has_ancestor_tag(LANDMARK_TAGS)
        {
            continue;
        }
        walk.element(landmark, &Context::default().enter(&landmark));
    }
    walk.blocks
}

#[derive(Default)]
struct Walk {
    blocks: Vec<Block>,
    /// Detected title, cleared once the first `<h1>` has been seen
    title: Option<String>,
}

impl Walk {
    fn with_title(title: Option<&str>) -> Self {
        Self { blocks: Vec::new(), title: title.map(|t| t.to_lowercase()) }
    }

    /// Whether `h1` is the title heading; only the first `<h1>` of the walk can be.
    fn takes_title(&mut self, h1: &Element<'_>) -> bool {
        let Some(title) = self.title.take() else {
            return false;
        };
        let text = clean_text(&h1.text()).to_lowercase();
        !text.is_empty() && (title.contains(&text) || text.contains(&title))
    }

    /// Visits the children of `element` under `ctx`
    fn element(&mut self, element: Element<'_>, ctx: &Context) {
        for child in element.child_elements() {
            let child_ctx = ctx.enter(&child);
            let tag = child.tag_name();

            if tag == "h1" && self.takes_title(&child) {
                continue;
            }

            match tag.as_str() {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = tag[1..].parse().unwrap_or(2);
                    self.push(BlockKind::Heading { level }, &child, &child_ctx, None);
                }
                "p" | "figcaption" => self.push(BlockKind::Paragraph, &child, &child_ctx, None),
                "blockquote" => {
                    self.push(BlockKind::Quotation, &child, &child_ctx, None);
                    self.element(child, &child_ctx);
                }
                "ul" | "ol" => self.list(child, &child_ctx, tag == "ol"),
                _ => self.element(child, &child_ctx),
            }
        }
    }

    fn list(&mut self, list: Element<'_>, ctx: &Context, ordered: bool) {
        let mut position = 0;
        for item in list.child_elements().filter(|el| el.tag_name() == "li") {
            position += 1;
            let item_ctx = ctx.enter(&item);
            self.push(BlockKind::ListItem { ordered }, &item, &item_ctx, Some(position));

            for nested in item.child_elements() {
                let nested_tag = nested.tag_name();
                if nested_tag == "ul" || nested_tag == "ol" {
                    self.list(nested, &item_ctx.enter(&nested), nested_tag == "ol");
                }
            }
        }
    }

    fn push(&mut self, kind: BlockKind, element: &Element<'_>, ctx: &Context, list_position: Option<u32>) {
        let skip_lists = matches!(kind, BlockKind::ListItem { .. });
        let mut inlines = Vec::new();
        collect_inlines(element.element_ref(), skip_lists, &mut inlines);

        let has_text = inlines.iter().any(|inline| match inline {
            Inline::Text(text) => !text.trim().is_empty(),
            Inline::Marker(_) => true,
        });
        if !has_text {
            return;
        }

        let origin = BlockOrigin {
            tag: element.tag_name(),
            landmark: ctx.landmark.clone(),
            class_tokens: ctx.class_tokens.clone(),
            link_density: link_density(element),
            in_footnote_list: ctx.in_footnotes,
            list_position,
        };
        self.blocks.push(Block::new(kind, inlines, origin));
    }
}

/// Flattens the subtree of `element` into text runs and footnote markers
fn collect_inlines(element: ElementRef<'_>, skip_lists: bool, out: &mut Vec<Inline>) {
    for node in element.children() {
        if let Some(text) = node.value().as_text() {
            push_text(out, text);
            continue;
        }

        let Some(child) = ElementRef::wrap(node) else {
            continue;
        };
        let name = child.value().name();

        match name {
            "sup" => {
                let text: String = child.text().collect();
                match footnotes::sup_label(&text) {
                    Some(label) => out.push(Inline::Marker(label)),
                    None => collect_inlines(child, skip_lists, out),
                }
            }
            "a" => {
                let href = child.value().attr("href").unwrap_or_default();
                if href.starts_with("#fnref") || href.starts_with("#footnote-ref") {
                    continue;
                }
                let text: String = child.text().collect();
                match footnotes::anchor_label(href) {
                    Some(label) if footnotes::sup_label(&text).is_some() => out.push(Inline::Marker(label)),
                    _ => collect_inlines(child, skip_lists, out),
                }
            }
            "br" => push_text(out, " "),
            "ul" | "ol" if skip_lists => {}
            _ if BLOCK_TAGS.contains(&name) => {
                push_text(out, " ");
                collect_inlines(child, skip_lists, out);
                push_text(out, " ");
            }
            _ => collect_inlines(child, skip_lists, out),
        }
    }
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}
