use crate::Document;

/// Title and date details detected in a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub published: Option<String>,
}

impl Document {
    /// Extract title and publication date in one pass
    pub fn extract_metadata(&self) -> Metadata {
        Metadata { title: self.extract_title(), published: self.extract_published() }
    }

    /// Extract title with priority fallback:
    /// 1. Open Graph `og:title`
    /// 2. First `<h1>` element
    /// 3. `<title>` element
    pub fn extract_title(&self) -> Option<String> {
        if let Some(title) = self.get_meta_content("og:title") {
            return Some(title);
        }

        if let Ok(Some(h1)) = self.select_first("h1") {
            let text = clean_text(&h1.text());
            if !text.is_empty() {
                return Some(text);
            }
        }

        self.title()
    }

    /// Extract publication date with priority fallback:
    /// 1. Meta `article:published_time`
    /// 2. Meta `date`, `pubdate`, `publish-date`, `publication_date`, `published_time`
    /// 3. `<time datetime>` attribute
    /// 4. `<time>` text
    pub fn extract_published(&self) -> Option<String> {
        if let Some(date) = self.get_meta_content("article:published_time") {
            return Some(date);
        }

        for name in ["date", "pubdate", "publish-date", "publication_date", "published_time"] {
            if let Some(date) = self.get_meta_content(name) {
                return Some(date);
            }
        }

        if let Ok(Some(time)) = self.select_first("time") {
            if let Some(datetime) = time.attr("datetime") {
                let datetime = clean_text(datetime);
                if !datetime.is_empty() {
                    return Some(datetime);
                }
            }

            let text = clean_text(&time.text());
            if !text.is_empty() {
                return Some(text);
            }
        }

        None
    }

    /// Get content of a meta tag by name or property
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        for key in ["name", "property"] {
            let selector = format!("meta[{}=\"{}\"]", key, attr);
            if let Ok(Some(el)) = self.select_first(&selector)
                && let Some(content) = el.attr("content")
            {
                let content = clean_text(content);
                if !content.is_empty() {
                    return Some(content);
                }
            }
        }

        None
    }
}

/// Replace non-breaking spaces and collapse runs of whitespace
pub(crate) fn clean_text(text: &str) -> String {
    text.replace('\u{a0}', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_prefers_open_graph() {
        let html = r#"
            <html><head>
                <title>Engelamiento | Blog de AEMET</title>
                <meta property="og:title" content="Engelamiento: la invención de una palabra aeronáutica">
            </head><body><h1>Engelamiento</h1></body></html>
        "#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(
            doc.extract_title(),
            Some("Engelamiento: la invención de una palabra aeronáutica".to_string())
        );
    }

    #[test]
    fn test_title_falls_back_to_h1_then_title() {
        let doc = Document::parse("<html><head><title>T</title></head><body><h1> Hielo\u{a0}en alas </h1></body></html>")
            .unwrap();
        assert_eq!(doc.extract_title(), Some("Hielo en alas".to_string()));

        let doc = Document::parse("<html><head><title>Solo título</title></head><body></body></html>").unwrap();
        assert_eq!(doc.extract_title(), Some("Solo título".to_string()));

        let doc = Document::parse("<html><body><p>nada</p></body></html>").unwrap();
        assert_eq!(doc.extract_title(), None);
    }

    #[test]
    fn test_published_from_meta() {
        let html = r#"<head><meta property="article:published_time" content="2026-02-12T08:00:00+00:00"></head>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.extract_published(), Some("2026-02-12T08:00:00+00:00".to_string()));
    }

    #[test]
    fn test_published_from_time_tag() {
        let doc = Document::parse(r#"<body><time datetime="2026-02-12">12 febrero</time></body>"#).unwrap();
        assert_eq!(doc.extract_published(), Some("2026-02-12".to_string()));

        let doc = Document::parse(r#"<body><time>12 febrero, 2026</time></body>"#).unwrap();
        assert_eq!(doc.extract_published(), Some("12 febrero, 2026".to_string()));
    }

    #[test]
    fn test_metadata_missing() {
        let doc = Document::parse("<body><p>texto</p></body>").unwrap();
        assert_eq!(doc.extract_metadata(), Metadata::default());
    }
}
