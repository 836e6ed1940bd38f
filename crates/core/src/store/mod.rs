//! Capture store contract and reference backends.
//!
//! The pipeline needs only [`CaptureStore`]: look up the latest snapshot of
//! a source and offer the next one. A store answers `Conflict` when another
//! writer already took that version. [`CaptureHistory`] adds the read side
//! used by history queries.

use std::sync::Arc;

use thiserror::Error;

use crate::snapshot::Snapshot;

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Errors reported by store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or the lookup did not complete.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Another writer already advanced the source to `latest`.
    #[error("version conflict: store is already at v{latest}")]
    Conflict { latest: u32 },

    /// The snapshot breaks the version sequence.
    #[error("snapshot rejected: {0}")]
    Rejected(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record could not be read back.
    #[error("corrupt store record: {0}")]
    Corrupt(String),
}

/// What the pipeline requires from persistence.
pub trait CaptureStore: Send + Sync {
    /// The highest version stored for `source_url`, if any.
    fn get_latest(&self, source_url: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Stores `snapshot` as the next version of its source.
    ///
    /// Fails with [`StoreError::Conflict`] when the stored latest version is
    /// already at or past `snapshot.version`. Either the whole snapshot is
    /// stored or nothing is.
    fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Read access to every stored version.
pub trait CaptureHistory {
    /// Stored versions of `source_url`, ascending.
    fn list_versions(&self, source_url: &str) -> Result<Vec<u32>, StoreError>;

    fn get(&self, source_url: &str, version: u32) -> Result<Option<Snapshot>, StoreError>;
}

impl<S: CaptureStore + ?Sized> CaptureStore for Arc<S> {
    fn get_latest(&self, source_url: &str) -> Result<Option<Snapshot>, StoreError> {
        (**self).get_latest(source_url)
    }

    fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        (**self).put(snapshot)
    }
}

impl<S: CaptureHistory + ?Sized> CaptureHistory for Arc<S> {
    fn list_versions(&self, source_url: &str) -> Result<Vec<u32>, StoreError> {
        (**self).list_versions(source_url)
    }

    fn get(&self, source_url: &str, version: u32) -> Result<Option<Snapshot>, StoreError> {
        (**self).get(source_url, version)
    }
}

/// Checks that `next` directly follows `latest`.
pub(crate) fn check_next_version(latest: u32, next: u32) -> Result<(), StoreError> {
    if next == 0 {
        return Err(StoreError::Rejected("versions start at 1".to_string()));
    }
    if next <= latest {
        return Err(StoreError::Conflict { latest });
    }
    if next != latest + 1 {
        return Err(StoreError::Rejected(format!("v{next} does not follow v{latest}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_next_version() {
        assert!(check_next_version(0, 1).is_ok());
        assert!(check_next_version(4, 5).is_ok());
        assert!(matches!(check_next_version(2, 2), Err(StoreError::Conflict { latest: 2 })));
        assert!(matches!(check_next_version(3, 1), Err(StoreError::Conflict { latest: 3 })));
        assert!(matches!(check_next_version(1, 3), Err(StoreError::Rejected(_))));
        assert!(matches!(check_next_version(0, 0), Err(StoreError::Rejected(_))));
    }
}
