//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working pipeline. Per-host [`SiteProfile`]s refine the defaults for sites
//! whose chrome the generic heuristics miss.
//!
//! ```toml
//! [noise]
//! phrases = ["Comparte esto", "Suscríbete al Blog"]
//!
//! [sites."aemetblog.es"]
//! body_selector = "div.entry-content"
//! noise_phrases = ["Descubre más desde"]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::versioner::VersioningPolicy;
use crate::{EstelaError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub noise: NoiseConfig,
    pub versioning: VersioningPolicy,
    pub store: StoreConfig,
    /// Site profiles keyed by host (`www.` is ignored on lookup).
    pub sites: HashMap<String, SiteProfile>,
}

/// Structural extractor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Selectors tried in order for the article container.
    pub body_selectors: Vec<String>,
    /// Title fragments that mark an error page.
    pub error_page_markers: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            body_selectors: vec!["article".to_string(), "main".to_string()],
            error_page_markers: ["404", "page not found", "página no encontrada", "not found", "error"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Boilerplate classifier settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Phrases that mark a block as chrome (matched case-insensitively).
    pub phrases: Vec<String>,
    /// Landmark tags whose content is chrome.
    pub chrome_tags: Vec<String>,
    /// Class or id fragments whose content is chrome.
    pub chrome_classes: Vec<String>,
    /// Paragraphs shorter than this, without footnote markers, are chrome.
    pub min_paragraph_chars: usize,
    /// Short blocks above this link density are chrome.
    pub max_link_density: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            phrases: [
                "Comparte esto",
                "Suscríbete al Blog",
                "Me gusta",
                "Relacionado",
                "Entradas relacionadas",
                "Deja un comentario",
                "Share this",
                "Subscribe",
                "Like this",
                "Related",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            chrome_tags: ["nav", "header", "footer", "aside", "form"].into_iter().map(String::from).collect(),
            chrome_classes: [
                "sharedaddy",
                "share",
                "social",
                "jp-relatedposts",
                "related",
                "subscribe",
                "newsletter",
                "comments",
                "breadcrumb",
                "menu",
                "widget",
                "post-navigation",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_paragraph_chars: 60,
            max_link_density: 0.5,
        }
    }
}

/// Where the filesystem store keeps its data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let root = dirs::data_dir()
            .map(|dir| dir.join("estela"))
            .unwrap_or_else(|| PathBuf::from("estela-data"));
        Self { root }
    }
}

/// Per-host overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Selector for the article container, tried before the generic ones.
    pub body_selector: Option<String>,
    /// Extra chrome phrases for this host.
    pub noise_phrases: Vec<String>,
    /// Extra chrome class fragments for this host.
    pub noise_classes: Vec<String>,
}

impl PipelineConfig {
    /// Parses configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| EstelaError::ConfigError(e.to_string()))
    }

    /// Loads configuration from an explicit path. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EstelaError::FileNotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Loads the default config file, falling back to defaults when it doesn't exist.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/estela/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("estela").join("config.toml"))
    }

    /// Looks up the site profile for a host.
    pub fn site(&self, host: &str) -> Option<&SiteProfile> {
        let bare = host.strip_prefix("www.").unwrap_or(host);
        self.sites
            .get(bare)
            .or_else(|| self.sites.get(host))
            .or_else(|| self.sites.get(&format!("www.{bare}")))
    }
}
