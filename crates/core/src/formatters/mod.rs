pub mod json;
pub mod markdown;

pub use json::{JsonConfig, JsonFormatter, manifest_to_json, snapshot_to_json};
pub use markdown::{MarkdownConfig, MarkdownFormatter, artifact_file_name, render_markdown};
