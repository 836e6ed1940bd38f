//! Getting raw pages from URLs, files, and stdin.
//!
//! Every source yields a [`RawPage`] with undecoded bytes; decoding is the
//! extractor's job.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::document::RawPage;
use crate::{EstelaError, Result};

/// HTTP client configuration for fetching pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 20,
            user_agent: "Mozilla/5.0 (compatible; Estela/0.1; article snapshots)".to_string(),
            accept_language: "es-ES,es;q=0.9,en;q=0.8".to_string(),
        }
    }
}

/// Fetches a page over HTTP(S).
///
/// Redirects are followed; the page keeps the URL that was asked for, so
/// every capture of a source lands under the same key.
pub async fn fetch_page(url: &str, config: &FetchConfig) -> Result<RawPage> {
    let parsed_url = Url::parse(url).map_err(|e| EstelaError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(EstelaError::InvalidUrl(format!("{url}: only http:// and https:// can be fetched")));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(EstelaError::HttpError)?;

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", &config.accept_language)
        .send()
        .await
        .map_err(|e| timeout_or_http(e, config.timeout))?
        .error_for_status()?;

    let bytes = response.bytes().await.map_err(|e| timeout_or_http(e, config.timeout))?;
    debug!(url, bytes = bytes.len(), "fetch.done");

    Ok(RawPage::now(url, bytes.to_vec()))
}

fn timeout_or_http(e: reqwest::Error, timeout: u64) -> EstelaError {
    if e.is_timeout() { EstelaError::Timeout { timeout } } else { EstelaError::HttpError(e) }
}

/// Reads a saved page from disk, recording it under `source_url`.
pub fn read_file_page(path: &Path, source_url: &str) -> Result<RawPage> {
    if !path.exists() {
        return Err(EstelaError::FileNotFound(path.to_path_buf()));
    }
    Ok(RawPage::now(source_url, fs::read(path)?))
}

/// Reads a page from standard input until EOF.
pub fn read_stdin_page(source_url: &str) -> Result<RawPage> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    Ok(RawPage::now(source_url, buffer))
}
