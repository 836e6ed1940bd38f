//! HTML parsing and DOM access.
//!
//! [`Document`] wraps a parsed page and [`Element`] a node inside it. Both
//! expose CSS selection; `Element` additionally exposes the facts the
//! structural walk needs (class tokens, landmark ancestors, raw node access).
//!
//! # Example
//!
//! ```rust
//! use estela_core::parse::Document;
//!
//! let doc = Document::parse("<article><p class=\"lead\">Hola</p></article>").unwrap();
//! let lead = doc.select("p.lead").unwrap();
//! assert_eq!(lead[0].text(), "Hola");
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::preprocess::{self, PreprocessConfig};
use crate::{EstelaError, Result};

/// A parsed HTML document.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML without preprocessing.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses HTML after cleaning it with [`preprocess_html`](crate::preprocess_html).
    ///
    /// Relative links and image sources are resolved against `base_url`.
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Result<Self> {
        let config = PreprocessConfig { base_url: base_url.clone(), ..Default::default() };

        let cleaned = preprocess::preprocess_html(html, &config);
        let html = Html::parse_document(&cleaned);

        Ok(Self { html, base_url })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`EstelaError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// First element matching `selector`, if any.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).next().map(Element::new))
    }

    /// The `<body>` element, or the root element for fragments without one.
    pub fn body(&'_ self) -> Element<'_> {
        self.select_first("body")
            .ok()
            .flatten()
            .unwrap_or_else(|| Element::new(self.html.root_element()))
    }

    /// Content of the `<title>` element, whitespace collapsed.
    pub fn title(&self) -> Option<String> {
        let el = self.select_first("title").ok().flatten()?;
        let text = collapse(&el.text());
        if text.is_empty() { None } else { Some(text) }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| EstelaError::HtmlParseError(format!("Invalid selector {selector:?}: {e}")))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A single element of a [`Document`].
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// The underlying scraper node, for walks over mixed text and element children.
    pub(crate) fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Concatenation of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Lowercased class names of this element, sorted, then its id.
    ///
    /// The parsed class set has no stable order.
    pub fn class_tokens(&self) -> Vec<String> {
        let value = self.element.value();
        let mut tokens: Vec<String> = value.classes().map(str::to_lowercase).collect();
        tokens.sort();
        tokens.dedup();
        if let Some(id) = value.id() {
            tokens.push(id.to_lowercase());
        }
        tokens
    }

    /// Child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.element.children().filter_map(ElementRef::wrap).map(Element::new)
    }

    /// Whether `other` is a strict ancestor of this element.
    pub fn is_descendant_of(&self, other: &Element<'_>) -> bool {
        self.element.ancestors().any(|node| node.id() == other.element.id())
    }

    /// Whether any ancestor carries one of `tags`.
    pub fn has_ancestor_tag(&self, tags: &[&str]) -> bool {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| tags.contains(&el.value().name()))
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`EstelaError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="es">
        <head>
            <meta charset="UTF-8">
            <title>  Engelamiento:
                la invención de una palabra  </title>
        </head>
        <body>
            <nav id="menu"><a href="/">Inicio</a></nav>
            <article id="entrada-7" class="post Entry hentry">
                <p class="content">Primer párrafo</p>
                <p class="content">Segundo párrafo</p>
            </article>
        </body>
        </html>
    "#;

    #[test]
    fn test_title_is_collapsed() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.title(), Some("Engelamiento: la invención de una palabra".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Primer párrafo");
        assert_eq!(elements[1].text(), "Segundo párrafo");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(EstelaError::HtmlParseError(_))));
    }

    #[test]
    fn test_class_tokens_and_children() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let article = doc.select_first("article").unwrap().unwrap();
        assert_eq!(article.class_tokens(), vec!["entry", "hentry", "post", "entrada-7"]);
        assert_eq!(article.child_elements().count(), 2);

        let nav = doc.select_first("nav").unwrap().unwrap();
        assert_eq!(nav.class_tokens(), vec!["menu"]);
    }

    #[test]
    fn test_ancestry() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let article = doc.select_first("article").unwrap().unwrap();
        let p = doc.select_first("p").unwrap().unwrap();
        let link = doc.select_first("nav a").unwrap().unwrap();

        assert!(p.is_descendant_of(&article));
        assert!(!link.is_descendant_of(&article));
        assert!(link.has_ancestor_tag(&["nav"]));
        assert!(!p.has_ancestor_tag(&["nav", "footer"]));
    }

    #[test]
    fn test_body_fallback() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.body().tag_name(), "body");
    }
}
