//! Persisted, versioned captures and the layout of their image assets.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::capture::{IndexedImage, NormalizedCapture};

/// Extensions kept as-is when planning local image paths
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Host label used when a URL has none
const FALLBACK_HOST: &str = "pagina";

/// One image of a snapshot: where it came from and where its copy belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifestEntry {
    pub index: u32,
    pub local_path: String,
    pub original_url: String,
}

/// A persisted version of a source.
///
/// Snapshots are immutable once the store accepts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub source_url: String,
    /// 1-based, strictly increasing per source.
    pub version: u32,
    /// When the page behind this version was fetched.
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
    /// When this version was produced.
    #[serde(with = "time::serde::rfc3339")]
    pub extracted_at: OffsetDateTime,
    pub content: NormalizedCapture,
    pub image_manifest: Vec<ImageManifestEntry>,
}

impl Snapshot {
    /// `<host>_<YYYYMMDD_HHMMSS>v<version>`, the stem shared by the artifact and its asset folder.
    pub fn file_stem(&self) -> String {
        format!("{}_{}v{}", host_label(&self.source_url), capture_stamp(self.extracted_at), self.version)
    }

    pub fn image_count(&self) -> usize {
        self.image_manifest.len()
    }

    /// Original image URLs in manifest order.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.image_manifest.iter().map(|entry| entry.original_url.as_str())
    }
}

/// Plans where each image of a snapshot is stored locally.
///
/// Downloading is left to the caller; the plan only fixes the manifest.
pub trait AssetLayout: Send + Sync {
    fn local_path(&self, stem: &str, image: &IndexedImage) -> String;
}

/// `assets/<stem>/img_<NNN><ext>`
#[derive(Debug, Clone)]
pub struct DefaultAssetLayout {
    pub root: String,
}

impl Default for DefaultAssetLayout {
    fn default() -> Self {
        Self { root: "assets".to_string() }
    }
}

impl AssetLayout for DefaultAssetLayout {
    fn local_path(&self, stem: &str, image: &IndexedImage) -> String {
        format!("{}/{stem}/img_{:03}{}", self.root, image.index, image_extension(&image.url))
    }
}

/// Builds the manifest for a capture about to become `stem`.
pub fn plan_manifest(layout: &dyn AssetLayout, stem: &str, content: &NormalizedCapture) -> Vec<ImageManifestEntry> {
    content
        .images
        .iter()
        .map(|image| ImageManifestEntry {
            index: image.index,
            local_path: layout.local_path(stem, image),
            original_url: image.url.clone(),
        })
        .collect()
}

/// Host without `www.`, or `pagina` when the URL has no host.
pub fn host_label(source_url: &str) -> String {
    Url::parse(source_url)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h).to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

/// `YYYYMMDD_HHMMSS` in UTC.
pub fn capture_stamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// RFC 3339 in UTC at second precision, e.g. `2026-02-12T10:15:00Z`.
pub fn iso_timestamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

fn image_extension(image_url: &str) -> &'static str {
    let path = Url::parse(image_url).map(|u| u.path().to_lowercase()).unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let extension = file.rfind('.').map(|dot| &file[dot..]).unwrap_or_default();
    IMAGE_EXTENSIONS.iter().find(|known| **known == extension).copied().unwrap_or(".jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn image(index: u32, url: &str) -> IndexedImage {
        IndexedImage { index, url: url.to_string(), alt: None }
    }

    #[test]
    fn test_host_label() {
        assert_eq!(host_label("https://www.aemetblog.es/2026/02/12/x/"), "aemetblog.es");
        assert_eq!(host_label("https://aemetblog.es/"), "aemetblog.es");
        assert_eq!(host_label("file:///tmp/captura.html"), "pagina");
        assert_eq!(host_label("no es una url"), "pagina");
    }

    #[test]
    fn test_stamps_are_utc() {
        let at = datetime!(2026-02-12 11:15:07 +01:00);
        assert_eq!(capture_stamp(at), "20260212_101507");
        assert_eq!(iso_timestamp(at), "2026-02-12T10:15:07Z");
    }

    #[test]
    fn test_default_layout() {
        let layout = DefaultAssetLayout::default();
        let stem = "aemetblog.es_20260212_101507v2";

        assert_eq!(
            layout.local_path(stem, &image(1, "https://aemetblog.es/wp-content/uploads/hielo.PNG")),
            "assets/aemetblog.es_20260212_101507v2/img_001.png"
        );
        assert_eq!(
            layout.local_path(stem, &image(12, "https://i0.wp.com/aemetblog.es/foto.jpeg?resize=640")),
            "assets/aemetblog.es_20260212_101507v2/img_012.jpeg"
        );
        assert_eq!(
            layout.local_path(stem, &image(3, "https://aemetblog.es/imagen.php?id=4")),
            "assets/aemetblog.es_20260212_101507v2/img_003.jpg"
        );
    }
}
