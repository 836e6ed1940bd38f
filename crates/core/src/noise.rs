//! Boilerplate detection.
//!
//! The extractor records structural facts about each block and asks a
//! [`NoiseClassifier`] whether the block is site chrome. The default
//! [`BoilerplateClassifier`] combines landmark tags, class/id fragments,
//! known phrases, link density and a short-fragment filter; any closure
//! `Fn(&Block) -> bool` can stand in for it.
//!
//! # Example
//!
//! ```rust
//! use estela_core::{Block, BlockKind, BlockOrigin, Inline, NoiseClassifier};
//!
//! let no_polls = |block: &Block| block.plain_text().contains("Encuesta");
//! let block = Block::new(BlockKind::Paragraph, vec![Inline::Text("Encuesta semanal".into())], BlockOrigin::default());
//! assert!(no_polls.is_noise(&block));
//! ```

use crate::config::{NoiseConfig, SiteProfile};
use crate::document::{Block, BlockKind};
use crate::metadata::clean_text;

/// Decides whether a block is site-wide chrome rather than article content.
pub trait NoiseClassifier: Send + Sync {
    fn is_noise(&self, block: &Block) -> bool;
}

impl<F> NoiseClassifier for F
where
    F: Fn(&Block) -> bool + Send + Sync,
{
    fn is_noise(&self, block: &Block) -> bool {
        self(block)
    }
}

/// Flags a block when any of its classifiers does.
#[derive(Default)]
pub struct AnyOf {
    classifiers: Vec<Box<dyn NoiseClassifier>>,
}

impl AnyOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, classifier: impl NoiseClassifier + 'static) -> Self {
        self.classifiers.push(Box::new(classifier));
        self
    }
}

impl NoiseClassifier for AnyOf {
    fn is_noise(&self, block: &Block) -> bool {
        self.classifiers.iter().any(|c| c.is_noise(block))
    }
}

/// Blocks longer than this never match on a contained phrase, only a leading one.
const PHRASE_CONTEXT_CHARS: usize = 120;

/// Short blocks this size or under are checked against the link density limit.
const LINK_LIST_CHARS: usize = 200;

/// Heuristic classifier driven by [`NoiseConfig`].
#[derive(Debug, Clone)]
pub struct BoilerplateClassifier {
    phrases: Vec<String>,
    chrome_tags: Vec<String>,
    chrome_classes: Vec<String>,
    min_paragraph_chars: usize,
    max_link_density: f64,
}

impl BoilerplateClassifier {
    pub fn new(config: &NoiseConfig) -> Self {
        Self {
            phrases: config.phrases.iter().map(|p| normalize_phrase(p)).filter(|p| !p.is_empty()).collect(),
            chrome_tags: config.chrome_tags.iter().map(|t| t.to_lowercase()).collect(),
            chrome_classes: config.chrome_classes.iter().map(|c| c.to_lowercase()).collect(),
            min_paragraph_chars: config.min_paragraph_chars,
            max_link_density: config.max_link_density,
        }
    }

    /// Classifier for one host: the defaults plus the site's own phrases and classes.
    pub fn for_site(config: &NoiseConfig, site: &SiteProfile) -> Self {
        let mut classifier = Self::new(config);
        classifier
            .phrases
            .extend(site.noise_phrases.iter().map(|p| normalize_phrase(p)).filter(|p| !p.is_empty()));
        classifier.chrome_classes.extend(site.noise_classes.iter().map(|c| c.to_lowercase()));
        classifier
    }

    fn in_chrome_landmark(&self, block: &Block) -> bool {
        block.origin.landmark.as_ref().is_some_and(|tag| self.chrome_tags.contains(tag))
    }

    fn has_chrome_class(&self, block: &Block) -> bool {
        block.origin.class_tokens.iter().any(|token| {
            self.chrome_classes.iter().any(|fragment| token_matches(token, fragment))
        })
    }

    fn matches_phrase(&self, text: &str) -> bool {
        let short = text.chars().count() <= PHRASE_CONTEXT_CHARS;
        self.phrases
            .iter()
            .any(|phrase| text.starts_with(phrase.as_str()) || (short && text.contains(phrase.as_str())))
    }

    fn is_fragment(&self, block: &Block, chars: usize) -> bool {
        block.kind == BlockKind::Paragraph
            && block.origin.tag == "p"
            && !block.origin.in_footnote_list
            && !block.has_markers()
            && chars < self.min_paragraph_chars
    }
}

impl Default for BoilerplateClassifier {
    fn default() -> Self {
        Self::new(&NoiseConfig::default())
    }
}

impl NoiseClassifier for BoilerplateClassifier {
    fn is_noise(&self, block: &Block) -> bool {
        if self.in_chrome_landmark(block) || self.has_chrome_class(block) {
            return true;
        }

        let text = normalize_phrase(&block.plain_text());
        let chars = text.chars().count();

        if self.matches_phrase(&text) {
            return true;
        }

        if chars <= LINK_LIST_CHARS && block.origin.link_density > self.max_link_density {
            return true;
        }

        self.is_fragment(block, chars)
    }
}

fn normalize_phrase(text: &str) -> String {
    clean_text(text).to_lowercase()
}

/// A class token matches a fragment when the fragment is a whole dash/underscore separated part
/// or a prefix of the token (`sharedaddy` matches `share`, `jp-relatedposts` matches itself).
fn token_matches(token: &str, fragment: &str) -> bool {
    token == fragment || token.starts_with(fragment) || token.split(['-', '_']).any(|part| part == fragment)
}
