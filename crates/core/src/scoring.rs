use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Positive patterns that suggest an element contains main content
static POSITIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)").unwrap()
});

/// Negative patterns that suggest an element does NOT contain main content
static NEGATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|share|shoutbox|sidebar|sponsor|widget|ad-break|agegate|pagination|pager|popup)",
    )
    .unwrap()
});

/// Points awarded per paragraph when ranking containers
const PARAGRAPH_WEIGHT: f64 = 200.0;

/// Calculate the class/ID weight of an element
///
/// Returns 1.0 for positive patterns, -1.0 for negative patterns (unless
/// also positive) and 0.0 otherwise. The id is checked before classes.
pub fn class_id_weight(element: &Element<'_>) -> f64 {
    let mut names = Vec::new();
    if let Some(id) = element.attr("id") {
        names.push(id);
    }
    if let Some(class) = element.attr("class") {
        names.extend(class.split_whitespace());
    }

    for name in names {
        if POSITIVE_PATTERN.is_match(name) {
            return 1.0;
        }
        if NEGATIVE_PATTERN.is_match(name) {
            return -1.0;
        }
    }

    0.0
}

/// Calculate the link density of an element
///
/// Link density is the ratio of link text characters to total text characters.
/// Returns a value from 0.0 (no links) to 1.0 (all text is in links).
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();

    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

/// Score a candidate article container
///
/// Text length plus a fixed bonus per paragraph, scaled down by link density
/// and halved for containers whose class or id looks like chrome.
pub fn container_score(element: &Element<'_>) -> f64 {
    let text_length = element.text().split_whitespace().map(|w| w.chars().count() + 1).sum::<usize>();
    if text_length == 0 {
        return 0.0;
    }

    let paragraphs = element.select("p").map(|p| p.len()).unwrap_or(0);
    let raw_score = text_length as f64 + paragraphs as f64 * PARAGRAPH_WEIGHT;

    let weight = match class_id_weight(element) {
        w if w < 0.0 => 0.5,
        w if w > 0.0 => 1.25,
        _ => 1.0,
    };

    raw_score * (1.0 - link_density(element)) * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;

    fn first<'a>(doc: &'a Document, selector: &str) -> Element<'a> {
        doc.select(selector).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn test_class_id_weight() {
        let doc = Document::parse(
            r#"<div id="main-content">a</div><div class="sharedaddy sd-sharing">b</div><div class="plain">c</div>"#,
        )
        .unwrap();

        assert_eq!(class_id_weight(&first(&doc, "#main-content")), 1.0);
        assert_eq!(class_id_weight(&first(&doc, ".sharedaddy")), -1.0);
        assert_eq!(class_id_weight(&first(&doc, ".plain")), 0.0);
    }

    #[test]
    fn test_link_density() {
        let doc = Document::parse(r#"<div id="a"><a href="/">Inicio</a></div><div id="b">Texto <a href="/">x</a></div>"#)
            .unwrap();

        assert_eq!(link_density(&first(&doc, "#a")), 1.0);
        let mixed = link_density(&first(&doc, "#b"));
        assert!(mixed > 0.0 && mixed < 0.5);
    }

    #[test]
    fn test_link_density_empty() {
        let doc = Document::parse("<div></div>").unwrap();
        assert_eq!(link_density(&first(&doc, "div")), 0.0);
    }

    #[test]
    fn test_container_score_prefers_prose() {
        let doc = Document::parse(
            r#"
            <div id="menu"><a href="/1">Inicio</a> <a href="/2">Blog</a> <a href="/3">Contacto</a></div>
            <div id="prose">
                <p>El engelamiento es la acumulación de hielo sobre la estructura de una aeronave.</p>
                <p>Se produce al atravesar nubes con gotas de agua subfundida.</p>
            </div>
            "#,
        )
        .unwrap();

        let menu = container_score(&first(&doc, "#menu"));
        let prose = container_score(&first(&doc, "#prose"));
        assert!(prose > menu * 10.0);
    }
}
