use crate::Result;
use crate::snapshot::{ImageManifestEntry, Snapshot};

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Pretty print JSON output
    pub pretty: bool,
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty { Ok(serde_json::to_string_pretty(value)?) } else { Ok(serde_json::to_string(value)?) }
}

/// Whole snapshot record, as stored by the filesystem store
pub fn snapshot_to_json(snapshot: &Snapshot, pretty: bool) -> Result<String> {
    to_json(snapshot, pretty)
}

/// The `.images.json` sidecar
pub fn manifest_to_json(manifest: &[ImageManifestEntry], pretty: bool) -> Result<String> {
    to_json(manifest, pretty)
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn snapshot(&self, snapshot: &Snapshot) -> Result<String> {
        snapshot_to_json(snapshot, self.config.pretty)
    }

    pub fn manifest(&self, snapshot: &Snapshot) -> Result<String> {
        manifest_to_json(&snapshot.image_manifest, self.config.pretty)
    }
}
