use std::fs;
use std::path::PathBuf;

use crate::fetch::Fetcher;
use crate::issue::IssueContext;
use crate::AssembleError;

/// A source periodical.
///
/// `name` picks the cache directory, `prefix` the output filename and
/// `scrape` turns the site into an [`IssueContext`] using the shared fetcher.
pub trait Site {
    fn name(&self) -> &str;
    fn prefix(&self) -> &str;
    fn base_url(&self) -> &str;
    fn scrape(&self, fetcher: &Fetcher) -> Result<IssueContext, AssembleError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Url(String),
    File(PathBuf),
}

impl ManifestSource {
    /// `http://` and `https://` inputs are fetched, anything else is a local path.
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            ManifestSource::Url(input.to_string())
        } else {
            ManifestSource::File(PathBuf::from(input))
        }
    }
}

/// Reads an already-scraped issue from a JSON document.
#[derive(Debug, Clone)]
pub struct ManifestSite {
    name: String,
    prefix: String,
    source: ManifestSource,
    label: String,
}

impl ManifestSite {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, source: ManifestSource) -> Self {
        let label = match &source {
            ManifestSource::Url(url) => url.clone(),
            ManifestSource::File(path) => path.display().to_string(),
        };
        Self {
            name: name.into(),
            prefix: prefix.into(),
            source,
            label,
        }
    }
}

impl Site for ManifestSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn base_url(&self) -> &str {
        &self.label
    }

    fn scrape(&self, fetcher: &Fetcher) -> Result<IssueContext, AssembleError> {
        let bytes = match &self.source {
            ManifestSource::Url(url) => fetcher.get(url, &[])?.body,
            ManifestSource::File(path) => fs::read(path)?,
        };
        serde_json::from_slice(&bytes)
            .map_err(|err| AssembleError::Manifest(format!("{}: {err}", self.label)))
    }
}
