use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static HIDDEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());

/// Configuration for markup preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Tags removed together with their content
    pub remove_tags: Vec<&'static str>,
    /// Whether to remove elements hidden by inline style or the `hidden` attribute
    pub remove_hidden: bool,
    /// Whether to promote `data-src` / `data-lazy-src` to `src` on lazy images
    pub promote_lazy_images: bool,
    /// Base URL for resolving relative links and image sources
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_tags: vec!["script", "style", "noscript", "iframe", "svg", "canvas", "template"],
            remove_hidden: true,
            promote_lazy_images: true,
            base_url: None,
        }
    }
}

/// Clean raw markup before structural extraction.
///
/// Drops non-content tags and comments, removes hidden elements and rewrites
/// image and link targets to absolute URLs.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_unwanted_tags(html, config);
    processed = remove_comments(&processed);

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.promote_lazy_images || config.base_url.is_some() {
        processed = rewrite_sources(&processed, config);
    }

    processed
}

/// Run a `lol_html` rewrite, returning the input untouched if the rewriter fails
fn rewrite<'h>(
    html: &str, handlers: Vec<(Cow<'h, lol_html::Selector>, lol_html::ElementContentHandlers<'h>)>,
) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }

    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove tags that never carry article text
fn remove_unwanted_tags(html: &str, config: &PreprocessConfig) -> String {
    if config.remove_tags.is_empty() {
        return html.to_string();
    }

    let handlers = config
        .remove_tags
        .iter()
        .map(|tag| {
            lol_html::element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite(html, handlers)
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    COMMENT_PATTERN.replace_all(html, "").to_string()
}

/// Remove elements with display:none, visibility:hidden or the `hidden` attribute
fn remove_hidden_elements(html: &str) -> String {
    rewrite(
        html,
        vec![lol_html::element!("*", |el| {
            let hidden_by_style = el.get_attribute("style").is_some_and(|style| HIDDEN_PATTERN.is_match(&style));
            if hidden_by_style || el.has_attribute("hidden") {
                el.remove();
            }
            Ok(())
        })],
    )
}

/// Pick the real source of an image, skipping empty and `data:` placeholders
fn image_source(src: Option<String>, data_src: Option<String>, lazy_src: Option<String>) -> Option<String> {
    [src, data_src, lazy_src]
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty() && !s.starts_with("data:"))
}

fn resolve(base_url: Option<&Url>, target: &str) -> Option<String> {
    match base_url {
        Some(base) => base.join(target).ok().map(|u| u.to_string()),
        None => None,
    }
}

/// Resolve link targets and image sources against the base URL
fn rewrite_sources(html: &str, config: &PreprocessConfig) -> String {
    let base_url = config.base_url.as_ref();
    let promote = config.promote_lazy_images;

    rewrite(
        html,
        vec![
            lol_html::element!("a[href]", move |el| {
                if let Some(href) = el.get_attribute("href")
                    && !href.starts_with('#')
                    && let Some(absolute) = resolve(base_url, &href)
                {
                    el.set_attribute("href", &absolute).ok();
                }
                Ok(())
            }),
            lol_html::element!("img", move |el| {
                let src = el.get_attribute("src");
                let chosen = if promote {
                    image_source(src, el.get_attribute("data-src"), el.get_attribute("data-lazy-src"))
                } else {
                    src
                };

                if let Some(chosen) = chosen {
                    let absolute = resolve(base_url, &chosen).unwrap_or(chosen);
                    el.set_attribute("src", &absolute).ok();
                }
                Ok(())
            }),
        ],
    )
}
