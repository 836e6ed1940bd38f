//! Version decisions.
//!
//! The versioner compares a fresh [`NormalizedCapture`] with the latest
//! [`Snapshot`] of the same source. A new version is cut when the body or
//! footnote text changed, or when the number of detected images changed.
//! Differences in timestamps or local asset paths never cut a version.
//!
//! # Example
//!
//! ```rust
//! use estela_core::{Decision, VersioningPolicy, Versioner};
//! # use estela_core::{NormalizedCapture, NormalizedBlock, BlockKind};
//! # use time::OffsetDateTime;
//! # let capture = NormalizedCapture {
//! #     source_url: "https://aemetblog.es/".into(), fetched_at: OffsetDateTime::UNIX_EPOCH,
//! #     title: None, published: None,
//! #     blocks: vec![NormalizedBlock::new(BlockKind::Paragraph, "Hielo")],
//! #     footnotes: vec![], images: vec![],
//! # };
//!
//! let versioner = Versioner::new(VersioningPolicy::default());
//! match versioner.decide(&capture, None, OffsetDateTime::UNIX_EPOCH) {
//!     Decision::PersistNewVersion { snapshot, .. } => assert_eq!(snapshot.version, 1),
//!     Decision::NoOp { .. } => unreachable!(),
//! }
//! ```

use std::fmt;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use crate::capture::NormalizedCapture;
use crate::snapshot::{self, AssetLayout, DefaultAssetLayout, Snapshot};
use crate::store::CaptureStore;
use crate::{EstelaError, Result};

/// Tunables for the equality rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VersioningPolicy {
    /// Also cut a version when the image count is equal but the original URLs differ.
    pub image_urls_significant: bool,
}

/// Why a new version was cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    FirstCapture,
    ContentChanged,
    ImageCountChanged { before: usize, after: usize },
    ImageSourcesChanged,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeReason::FirstCapture => write!(f, "first capture"),
            ChangeReason::ContentChanged => write!(f, "content changed"),
            ChangeReason::ImageCountChanged { before, after } => write!(f, "image count {before} -> {after}"),
            ChangeReason::ImageSourcesChanged => write!(f, "image sources changed"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Decision {
    PersistNewVersion { snapshot: Snapshot, reason: ChangeReason },
    NoOp { version: u32 },
}

pub struct Versioner {
    policy: VersioningPolicy,
    layout: Box<dyn AssetLayout>,
}

impl Versioner {
    pub fn new(policy: VersioningPolicy) -> Self {
        Self { policy, layout: Box::new(DefaultAssetLayout::default()) }
    }

    pub fn with_layout(mut self, layout: impl AssetLayout + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Decides against an already loaded latest snapshot.
    pub fn decide(&self, capture: &NormalizedCapture, latest: Option<&Snapshot>, extracted_at: OffsetDateTime) -> Decision {
        let Some(reason) = self.change_reason(capture, latest) else {
            let version = latest.map_or(0, |s| s.version);
            info!(source_url = %capture.source_url, version, "versioner.unchanged");
            return Decision::NoOp { version };
        };

        let version = latest.map_or(1, |s| s.version + 1);
        let mut snapshot = Snapshot {
            source_url: capture.source_url.clone(),
            version,
            captured_at: capture.fetched_at,
            extracted_at,
            content: capture.clone(),
            image_manifest: Vec::new(),
        };
        snapshot.image_manifest = snapshot::plan_manifest(self.layout.as_ref(), &snapshot.file_stem(), capture);

        info!(source_url = %capture.source_url, version, reason = %reason, "versioner.new_version");
        Decision::PersistNewVersion { snapshot, reason }
    }

    /// Reads the latest snapshot from `store` and decides.
    ///
    /// # Errors
    ///
    /// A failed lookup is [`EstelaError::VersionerUnavailable`], never a silent first capture.
    pub fn decide_against<S>(&self, store: &S, capture: &NormalizedCapture, extracted_at: OffsetDateTime) -> Result<Decision>
    where
        S: CaptureStore + ?Sized,
    {
        let latest = store.get_latest(&capture.source_url).map_err(|e| EstelaError::VersionerUnavailable {
            url: capture.source_url.clone(),
            reason: e.to_string(),
        })?;

        if let Some(latest) = &latest
            && latest.source_url != capture.source_url
        {
            return Err(EstelaError::SourceMismatch {
                expected: capture.source_url.clone(),
                found: latest.source_url.clone(),
            });
        }

        Ok(self.decide(capture, latest.as_ref(), extracted_at))
    }

    fn change_reason(&self, capture: &NormalizedCapture, latest: Option<&Snapshot>) -> Option<ChangeReason> {
        let Some(latest) = latest else {
            return Some(ChangeReason::FirstCapture);
        };

        if !capture.content_eq(&latest.content) {
            return Some(ChangeReason::ContentChanged);
        }

        let (before, after) = (latest.image_count(), capture.image_count());
        if before != after {
            return Some(ChangeReason::ImageCountChanged { before, after });
        }

        if self.policy.image_urls_significant && !latest.image_urls().eq(capture.images.iter().map(|i| i.url.as_str()))
        {
            return Some(ChangeReason::ImageSourcesChanged);
        }

        None
    }
}

impl Default for Versioner {
    fn default() -> Self {
        Self::new(VersioningPolicy::default())
    }
}
