use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{CaptureHistory, CaptureStore, StoreError, check_next_version};
use crate::formatters::markdown::render_markdown;
use crate::snapshot::{Snapshot, host_label};

const RECORDS_DIR: &str = "records";

/// Hex digits of the URL hash used in directory names
const URL_HASH_LEN: usize = 16;

/// Filesystem store.
///
/// Layout per source:
///
/// ```text
/// <root>/<host>/<url-hash>/
///     records/v000001.json              committed snapshot record
///     <host>_<stamp>v1.md               rendered artifact
///     <host>_<stamp>v1.images.json      image manifest
/// ```
///
/// The record is the commit point. It is staged in a temporary file and
/// linked into place only if no record for that version exists, so two
/// writers racing for the same version cannot both succeed.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root)?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every version of `source_url`.
    pub fn source_dir(&self, source_url: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(source_url.as_bytes()));
        self.root.join(host_label(source_url)).join(&digest[..URL_HASH_LEN])
    }

    pub fn artifact_path(&self, snapshot: &Snapshot) -> PathBuf {
        self.source_dir(&snapshot.source_url).join(format!("{}.md", snapshot.file_stem()))
    }

    pub fn manifest_path(&self, snapshot: &Snapshot) -> PathBuf {
        self.source_dir(&snapshot.source_url).join(format!("{}.images.json", snapshot.file_stem()))
    }

    fn records_dir(&self, source_url: &str) -> PathBuf {
        self.source_dir(source_url).join(RECORDS_DIR)
    }

    fn record_path(&self, source_url: &str, version: u32) -> PathBuf {
        self.records_dir(source_url).join(format!("v{version:06}.json"))
    }

    fn latest_version(&self, source_url: &str) -> Result<u32, StoreError> {
        Ok(self.list_versions(source_url)?.last().copied().unwrap_or(0))
    }

    fn read_record(&self, path: &Path) -> Result<Option<Snapshot>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
    }

    /// Writes the rendered artifact and manifest next to a committed record
    fn write_artifacts(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let dir = self.source_dir(&snapshot.source_url);

        let artifact = stage(&dir, render_markdown(snapshot).as_bytes())?;
        artifact.persist(self.artifact_path(snapshot)).map_err(|e| StoreError::Io(e.error))?;

        let manifest = stage(&dir, &serde_json::to_vec_pretty(&snapshot.image_manifest)?)?;
        manifest.persist(self.manifest_path(snapshot)).map_err(|e| StoreError::Io(e.error))?;

        Ok(())
    }
}

fn stage(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile, StoreError> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

impl CaptureStore for FsStore {
    fn get_latest(&self, source_url: &str) -> Result<Option<Snapshot>, StoreError> {
        match self.latest_version(source_url)? {
            0 => Ok(None),
            version => self.read_record(&self.record_path(source_url, version)),
        }
    }

    fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let records = self.records_dir(&snapshot.source_url);
        fs::create_dir_all(&records)?;

        check_next_version(self.latest_version(&snapshot.source_url)?, snapshot.version)?;

        let record = stage(&records, &serde_json::to_vec_pretty(snapshot)?)?;
        let path = self.record_path(&snapshot.source_url, snapshot.version);
        if let Err(e) = record.persist_noclobber(&path) {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                let latest = self.latest_version(&snapshot.source_url).unwrap_or(snapshot.version);
                return Err(StoreError::Conflict { latest });
            }
            return Err(StoreError::Io(e.error));
        }
        debug!(path = %path.display(), version = snapshot.version, "fs_store.committed");

        // The version exists from here on; artifacts can be rendered again from the record.
        if let Err(e) = self.write_artifacts(snapshot) {
            warn!(source_url = %snapshot.source_url, version = snapshot.version, error = %e, "fs_store.artifacts_failed");
        }

        Ok(())
    }
}

impl CaptureHistory for FsStore {
    fn list_versions(&self, source_url: &str) -> Result<Vec<u32>, StoreError> {
        let entries = match fs::read_dir(self.records_dir(source_url)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(version) = name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u32>().ok())
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn get(&self, source_url: &str, version: u32) -> Result<Option<Snapshot>, StoreError> {
        self.read_record(&self.record_path(source_url, version))
    }
}
