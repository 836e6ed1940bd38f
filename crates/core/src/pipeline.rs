//! One capture cycle from raw page to stored snapshot.
//!
//! ```rust
//! use estela_core::{MemoryStore, Outcome, Pipeline, PipelineConfig, RawPage};
//!
//! let pipeline = Pipeline::new(&PipelineConfig::default(), MemoryStore::new());
//! let html = "<article><p>El engelamiento es la acumulación de hielo sobre la estructura de una aeronave.</p></article>";
//!
//! let first = pipeline.process(&RawPage::now("https://aemetblog.es/engelamiento/", html)).unwrap();
//! assert!(matches!(first, Outcome::Persisted(ref s) if s.version == 1));
//!
//! let again = pipeline.process(&RawPage::now("https://aemetblog.es/engelamiento/", html)).unwrap();
//! assert!(matches!(again, Outcome::Unchanged { version: 1 }));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tracing::warn;

use crate::capture::NormalizedCapture;
use crate::config::PipelineConfig;
use crate::document::RawPage;
use crate::extract::Extractor;
use crate::normalize::normalize;
use crate::snapshot::Snapshot;
use crate::store::{CaptureStore, StoreError};
use crate::versioner::{Decision, Versioner};
use crate::{EstelaError, Result};

/// Attempts at `put` before a conflict is surfaced
const PUT_ATTEMPTS: u32 = 2;

/// What a capture cycle did.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A new version was stored.
    Persisted(Snapshot),
    /// The capture matched the stored `version`; nothing was written.
    Unchanged { version: u32 },
}

impl Outcome {
    pub fn version(&self) -> u32 {
        match self {
            Outcome::Persisted(snapshot) => snapshot.version,
            Outcome::Unchanged { version } => *version,
        }
    }
}

/// Extractor, normalizer and versioner wired to a store.
pub struct Pipeline<S> {
    extractor: Extractor,
    versioner: Versioner,
    store: S,
}

impl<S: CaptureStore> Pipeline<S> {
    pub fn new(config: &PipelineConfig, store: S) -> Self {
        Self { extractor: Extractor::new(config), versioner: Versioner::new(config.versioning.clone()), store }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_versioner(mut self, versioner: Versioner) -> Self {
        self.versioner = versioner;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Extracts and normalizes without touching the store.
    pub fn capture(&self, page: &RawPage) -> Result<NormalizedCapture> {
        normalize(self.extractor.extract(page)?)
    }

    /// Runs a full cycle stamped with the current time.
    pub fn process(&self, page: &RawPage) -> Result<Outcome> {
        self.process_at(page, OffsetDateTime::now_utc())
    }

    /// Runs a full cycle with an explicit extraction time.
    ///
    /// On a store conflict the latest snapshot is read again and the
    /// decision recomputed once; a second conflict is returned as
    /// [`EstelaError::Conflict`].
    pub fn process_at(&self, page: &RawPage, extracted_at: OffsetDateTime) -> Result<Outcome> {
        let capture = self.capture(page)?;

        let mut attempt = 1;
        loop {
            let snapshot = match self.versioner.decide_against(&self.store, &capture, extracted_at)? {
                Decision::NoOp { version } => return Ok(Outcome::Unchanged { version }),
                Decision::PersistNewVersion { snapshot, .. } => snapshot,
            };

            match self.store.put(&snapshot) {
                Ok(()) => return Ok(Outcome::Persisted(snapshot)),
                Err(StoreError::Conflict { latest }) if attempt < PUT_ATTEMPTS => {
                    warn!(
                        source_url = %capture.source_url,
                        attempted = snapshot.version,
                        latest,
                        "pipeline.conflict_retry"
                    );
                    attempt += 1;
                }
                Err(StoreError::Conflict { latest }) => {
                    return Err(EstelaError::Conflict {
                        url: capture.source_url.clone(),
                        attempted: snapshot.version,
                        latest,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Like [`process`](Self::process), holding the source's lock for the whole cycle.
    pub fn process_locked(&self, page: &RawPage, locks: &SourceLocks) -> Result<Outcome> {
        let lock = locks.lock_for(&page.source_url);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.process(page)
    }
}

/// Per-source mutexes for callers that serialize captures in-process.
#[derive(Debug, Default)]
pub struct SourceLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `source_url`, created on first use.
    pub fn lock_for(&self, source_url: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(source_url.to_string()).or_default())
    }
}
