//! Document locations and content loading
//!
//! A location names where DSL text comes from: a URI (HTTP, file, or a
//! bare filesystem path) or literal text carried in the request itself.

use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use super::issues::IssueRecord;

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Fetched or read from a URI or filesystem path
    Uri(String),
    /// Inlined in the request
    Literal(String),
}

impl Location {
    /// Short form for use in issue locators.
    pub fn describe(&self) -> String {
        match self {
            Self::Uri(uri) => uri.clone(),
            Self::Literal(_) => "<literal>".to_string(),
        }
    }
}

/// Loads document text from a location.
///
/// HTTP and HTTPS URIs are fetched; `file:` URIs and bare paths are read
/// from the filesystem, with relative paths searched against the
/// configured prefixes. Failures are reported as validation issues, not
/// transport errors: an unreachable document is a property of the
/// request, not of the service.
pub struct UriLoader {
    client: reqwest::Client,
}

impl UriLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn load(
        &self,
        location: &Location,
        prefixes: &[PathBuf],
    ) -> Result<String, IssueRecord> {
        match location {
            Location::Literal(text) => Ok(text.clone()),
            Location::Uri(uri) => match Url::parse(uri) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                    self.fetch(&url).await
                }
                Ok(url) if url.scheme() == "file" => {
                    let path = url.to_file_path().map_err(|_| {
                        IssueRecord::error(format!("invalid file URI '{uri}'")).at(uri.clone())
                    })?;
                    std::fs::read_to_string(&path).map_err(|e| read_issue(uri, &e))
                }
                Ok(url) => Err(IssueRecord::error(format!(
                    "unsupported URI scheme '{}'",
                    url.scheme()
                ))
                .at(uri.clone())),
                // Not a URL; treat as a filesystem path
                Err(_) => read_path(Path::new(uri), prefixes).map_err(|e| read_issue(uri, &e)),
            },
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String, IssueRecord> {
        debug!("Fetching document from {}", url);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                IssueRecord::error(format!("failed to fetch '{url}': {e}")).at(url.to_string())
            })?;
        response.text().await.map_err(|e| {
            IssueRecord::error(format!("failed to fetch '{url}': {e}")).at(url.to_string())
        })
    }
}

/// Read a filesystem path, searching relative paths against each prefix.
fn read_path(path: &Path, prefixes: &[PathBuf]) -> std::io::Result<String> {
    if path.is_absolute() {
        return std::fs::read_to_string(path);
    }

    // Try the path as given, then against each search prefix.
    let mut last_err = match std::fs::read_to_string(path) {
        Ok(text) => return Ok(text),
        Err(e) => e,
    };
    for prefix in prefixes {
        match std::fs::read_to_string(prefix.join(path)) {
            Ok(text) => return Ok(text),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn read_issue(uri: &str, error: &std::io::Error) -> IssueRecord {
    IssueRecord::error(format!("failed to read '{uri}': {error}")).at(uri.to_string())
}
