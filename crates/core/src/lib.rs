//! Snapshot-based article capture.
//!
//! A capture cycle turns a fetched page into a versioned snapshot:
//!
//! 1. [`Extractor`] walks the markup into typed blocks, footnote definitions
//!    and image references, setting site chrome aside as noise.
//! 2. [`normalize`] renumbers footnotes by first appearance, indexes images
//!    and rejects captures whose markers and notes disagree.
//! 3. [`Versioner`] compares the result with the latest stored [`Snapshot`]
//!    and cuts a new version only when the content or image count changed.
//! 4. A [`CaptureStore`] persists the snapshot, refusing stale versions.
//!
//! [`Pipeline`] runs all four steps.
//!
//! ```rust
//! use estela_core::{MemoryStore, Pipeline, PipelineConfig, RawPage};
//!
//! let html = r#"<article>
//!     <p>El término engelamiento se documenta por primera vez en un manual de 1948 (1).</p>
//!     <p>(1) Manual de meteorología aeronáutica.</p>
//! </article>"#;
//!
//! let pipeline = Pipeline::new(&PipelineConfig::default(), MemoryStore::new());
//! let capture = pipeline.capture(&RawPage::now("https://aemetblog.es/engelamiento/", html)).unwrap();
//!
//! assert_eq!(capture.blocks[0].text, "El término engelamiento se documenta por primera vez en un manual de 1948[^1].");
//! assert_eq!(capture.footnotes[0].text, "Manual de meteorología aeronáutica.");
//! ```

pub mod capture;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod footnotes;
pub mod formatters;
pub mod metadata;
pub mod noise;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod preprocess;
pub mod scoring;
pub mod snapshot;
pub mod store;
pub mod versioner;

pub use capture::{IndexedImage, NormalizedBlock, NormalizedCapture, NormalizedFootnote};
pub use config::{ExtractorConfig, NoiseConfig, PipelineConfig, SiteProfile, StoreConfig};
pub use document::{Block, BlockKind, BlockOrigin, Footnote, ImageRef, Inline, RawPage, SourceDocument};
pub use error::{ErrorKind, EstelaError, Result};
pub use extract::Extractor;
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, fetch_page, read_file_page, read_stdin_page};
pub use formatters::{JsonConfig, JsonFormatter, MarkdownConfig, MarkdownFormatter};
pub use formatters::{artifact_file_name, manifest_to_json, render_markdown, snapshot_to_json};
pub use metadata::Metadata;
pub use noise::{AnyOf, BoilerplateClassifier, NoiseClassifier};
pub use normalize::normalize;
pub use parse::Document;
pub use pipeline::{Outcome, Pipeline, SourceLocks};
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use snapshot::{AssetLayout, DefaultAssetLayout, ImageManifestEntry, Snapshot};
pub use store::{CaptureHistory, CaptureStore, FsStore, MemoryStore, StoreError};
pub use versioner::{ChangeReason, Decision, Versioner, VersioningPolicy};
