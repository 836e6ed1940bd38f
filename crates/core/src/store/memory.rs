use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{CaptureHistory, CaptureStore, StoreError, check_next_version};
use crate::snapshot::Snapshot;

/// In-process store keyed by source URL.
///
/// Each instance owns its own map; share it between pipelines with `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sources: Mutex<HashMap<String, Vec<Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots across all sources.
    pub fn len(&self) -> usize {
        self.sources().map(|sources| sources.values().map(Vec::len).sum()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sources(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Snapshot>>>, StoreError> {
        self.sources.lock().map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl CaptureStore for MemoryStore {
    fn get_latest(&self, source_url: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.sources()?.get(source_url).and_then(|versions| versions.last().cloned()))
    }

    fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut sources = self.sources()?;
        let versions = sources.entry(snapshot.source_url.clone()).or_default();
        let latest = versions.last().map_or(0, |s| s.version);

        check_next_version(latest, snapshot.version)?;
        versions.push(snapshot.clone());
        Ok(())
    }
}

impl CaptureHistory for MemoryStore {
    fn list_versions(&self, source_url: &str) -> Result<Vec<u32>, StoreError> {
        Ok(self
            .sources()?
            .get(source_url)
            .map(|versions| versions.iter().map(|s| s.version).collect())
            .unwrap_or_default())
    }

    fn get(&self, source_url: &str, version: u32) -> Result<Option<Snapshot>, StoreError> {
        Ok(self
            .sources()?
            .get(source_url)
            .and_then(|versions| versions.iter().find(|s| s.version == version).cloned()))
    }
}
