//! Error types for capture operations.
//!
//! [`EstelaError`] covers every failure a capture job can hit, from markup
//! that carries no article to a store that raced ahead of us. Every error is
//! scoped to one source URL; nothing here is fatal to the process.
//!
//! # Example
//!
//! ```rust
//! use estela_core::{EstelaError, ErrorKind};
//!
//! let err = EstelaError::DanglingFootnoteMarker { marker: "3".to_string() };
//! assert_eq!(err.kind(), ErrorKind::Normalization);
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Coarse classification of [`EstelaError`] used by callers to pick a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Markup could not be turned into a document. The job is aborted.
    Extraction,
    /// Footnote markers and footnote texts disagree. The job is aborted.
    Normalization,
    /// The prior snapshot could not be read. Retry with backoff.
    VersionerUnavailable,
    /// A concurrent writer kept winning the version race.
    Conflict,
    /// The store rejected or mangled a record.
    Store,
    /// Invalid configuration.
    Config,
    /// Local input or output failed.
    Io,
    /// Fetching the page failed.
    Fetch,
}

/// Main error type for the capture pipeline.
///
/// # Example
///
/// ```rust
/// use estela_core::{EstelaError, Extractor, PipelineConfig, RawPage};
///
/// let extractor = Extractor::new(&PipelineConfig::default());
/// let page = RawPage::now("https://example.com/", "<html><body></body></html>");
/// match extractor.extract(&page) {
///     Err(EstelaError::NoArticleBody { url }) => println!("nothing to archive at {url}"),
///     Err(e) => println!("Error: {e}"),
///     Ok(doc) => println!("{} blocks", doc.body_blocks.len()),
/// }
/// ```
#[derive(Error, Debug)]
pub enum EstelaError {
    /// HTTP request errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML could not be parsed, usually an invalid CSS selector from a site profile.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Raw markup is not valid UTF-8.
    #[error("Invalid character encoding")]
    InvalidEncoding,

    /// The page has no recognizable article body.
    #[error("No article body found at {url}")]
    NoArticleBody { url: String },

    /// The page looks like an error page rather than an article.
    #[error("{url} looks like an error page ({reason})")]
    ErrorPage { url: String, reason: String },

    /// A body marker has no footnote text.
    #[error("Footnote marker {marker} has no matching footnote text")]
    DanglingFootnoteMarker { marker: String },

    /// A footnote text is never referenced from the body.
    #[error("Footnote {marker} is never referenced from the body")]
    OrphanFootnote { marker: String },

    /// The same marker is defined twice.
    #[error("Footnote {marker} is defined more than once")]
    DuplicateFootnote { marker: String },

    /// The latest snapshot could not be read, so no decision can be made safely.
    #[error("Versioner unavailable for {url}: {reason}")]
    VersionerUnavailable { url: String, reason: String },

    /// The store kept reporting a newer version after the single retry.
    #[error("Version conflict for {url}: tried v{attempted} but store is at v{latest}")]
    Conflict { url: String, attempted: u32, latest: u32 },

    /// Store failures other than lookup and conflict.
    #[error("Capture store error: {0}")]
    Store(#[from] StoreError),

    /// The store returned a snapshot for a different source.
    #[error("Store returned a snapshot of {found} while looking up {expected}")]
    SourceMismatch { expected: String, found: String },

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EstelaError {
    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "fetch")]
            EstelaError::HttpError(_) => ErrorKind::Fetch,
            EstelaError::Timeout { .. } => ErrorKind::Fetch,
            EstelaError::InvalidUrl(_)
            | EstelaError::HtmlParseError(_)
            | EstelaError::InvalidEncoding
            | EstelaError::NoArticleBody { .. }
            | EstelaError::ErrorPage { .. } => ErrorKind::Extraction,
            EstelaError::DanglingFootnoteMarker { .. }
            | EstelaError::OrphanFootnote { .. }
            | EstelaError::DuplicateFootnote { .. } => ErrorKind::Normalization,
            EstelaError::VersionerUnavailable { .. } => ErrorKind::VersionerUnavailable,
            EstelaError::Conflict { .. } => ErrorKind::Conflict,
            EstelaError::Store(_) | EstelaError::SourceMismatch { .. } | EstelaError::Json(_) => ErrorKind::Store,
            EstelaError::FileNotFound(_) | EstelaError::Io(_) => ErrorKind::Io,
            EstelaError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Whether the caller should retry the whole job later.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::VersionerUnavailable | ErrorKind::Conflict | ErrorKind::Fetch)
    }
}

/// Result type alias for EstelaError.
pub type Result<T> = std::result::Result<T, EstelaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EstelaError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_conflict_error_mentions_versions() {
        let err = EstelaError::Conflict { url: "https://aemetblog.es/".to_string(), attempted: 3, latest: 4 };
        assert!(err.to_string().contains("v3"));
        assert!(err.to_string().contains("v4"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(EstelaError::NoArticleBody { url: "u".into() }.kind(), ErrorKind::Extraction);
        assert_eq!(EstelaError::InvalidEncoding.kind(), ErrorKind::Extraction);
        assert_eq!(EstelaError::OrphanFootnote { marker: "2".into() }.kind(), ErrorKind::Normalization);
        assert_eq!(
            EstelaError::VersionerUnavailable { url: "u".into(), reason: "down".into() }.kind(),
            ErrorKind::VersionerUnavailable
        );
    }

    #[test]
    fn test_retryable() {
        assert!(EstelaError::VersionerUnavailable { url: "u".into(), reason: "down".into() }.is_retryable());
        assert!(!EstelaError::DanglingFootnoteMarker { marker: "1".into() }.is_retryable());
        assert!(EstelaError::Timeout { timeout: 30 }.is_retryable());
    }
}
