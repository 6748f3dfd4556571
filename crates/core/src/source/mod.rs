//! Retrieval of the file under analysis.
//!
//! A [`FileSource`] turns a user-supplied URL into a [`SourceDocument`]: the text of a Python
//! script, or the concatenated code cells of a notebook together with a digest of its
//! documentation cells.

mod notebook;

pub use notebook::{extract_notebook, DocumentationDigest};

use crate::{CritiqueError, CritiqueResult};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static GITHUB_BLOB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/blob/([^/]+)/(.+)$")
        .expect("blob URL pattern is valid")
});

const RAW_HOST_PREFIX: &str = "https://raw.githubusercontent.com/";

/// What kind of file a URL points at, decided from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Script,
    Notebook,
}

impl SourceKind {
    /// Classifies `url` by extension, ignoring any query string or fragment.
    ///
    /// # Errors
    ///
    /// Returns [`CritiqueError::UnsupportedFormat`] for anything other than `.py` or `.ipynb`.
    pub fn from_url(url: &str) -> CritiqueResult<Self> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if path.ends_with(".py") {
            Ok(SourceKind::Script)
        } else if path.ends_with(".ipynb") {
            Ok(SourceKind::Notebook)
        } else {
            Err(CritiqueError::UnsupportedFormat(url.to_string()))
        }
    }
}

/// Converts a GitHub page URL into the URL of the raw file contents.
///
/// Raw URLs pass through unchanged.
///
/// # Errors
///
/// Returns [`CritiqueError::InvalidInput`] for a blank URL and [`CritiqueError::InvalidUrl`]
/// for anything that is neither a GitHub blob URL nor a raw content URL.
pub fn github_raw_url(url: &str) -> CritiqueResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CritiqueError::InvalidInput("URL must not be empty".into()));
    }

    if url.starts_with(RAW_HOST_PREFIX) {
        return Ok(url.to_string());
    }

    let caps = GITHUB_BLOB_URL
        .captures(url)
        .ok_or_else(|| CritiqueError::InvalidUrl(url.to_string()))?;

    Ok(format!(
        "{}{}/{}/{}/{}",
        RAW_HOST_PREFIX,
        &caps[1],
        &caps[2],
        &caps[3],
        &caps[4]
    ))
}

/// A fetched file, ready for prompting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    pub kind: SourceKind,
    pub text: String,
    pub digest: Option<DocumentationDigest>,
}

impl SourceDocument {
    /// Builds a document from raw file contents.
    ///
    /// # Errors
    ///
    /// Returns [`CritiqueError::NotebookParse`] when a notebook cannot be read.
    pub fn from_content(kind: SourceKind, content: &str) -> CritiqueResult<Self> {
        match kind {
            SourceKind::Script => Ok(Self {
                kind,
                text: content.to_string(),
                digest: None,
            }),
            SourceKind::Notebook => {
                let (text, digest) = extract_notebook(content)?;
                Ok(Self {
                    kind,
                    text,
                    digest: (!digest.is_empty()).then_some(digest),
                })
            }
        }
    }
}

/// Something that can retrieve the file behind a URL.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch(&self, url: &str) -> CritiqueResult<SourceDocument>;
}

/// Fetches files from GitHub over HTTPS.
#[derive(Clone, Debug)]
pub struct GitHubSource {
    client: reqwest::Client,
}

impl GitHubSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> CritiqueResult<Self> {
        Ok(Self::new(crate::backend::http_client(timeout)?))
    }
}

#[async_trait]
impl FileSource for GitHubSource {
    async fn fetch(&self, url: &str) -> CritiqueResult<SourceDocument> {
        // Both checks run before any network I/O.
        let kind = SourceKind::from_url(url.trim())?;
        let raw_url = github_raw_url(url)?;

        tracing::debug!("fetching {}", raw_url);

        let content = self
            .client
            .get(&raw_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| CritiqueError::Fetch(format!("GET {}: {}", raw_url, e)))?
            .text()
            .await
            .map_err(|e| CritiqueError::Fetch(format!("reading body of {}: {}", raw_url, e)))?;

        SourceDocument::from_content(kind, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_url_becomes_raw_url() {
        let raw = github_raw_url(
            "https://github.com/emirryilmazz/Fish-Classification/blob/main/main.ipynb",
        )
        .unwrap();
        assert_eq!(
            raw,
            "https://raw.githubusercontent.com/emirryilmazz/Fish-Classification/main/main.ipynb"
        );
    }

    #[test]
    fn test_nested_path_is_preserved() {
        let raw = github_raw_url("https://github.com/u/r/blob/dev/pkg/sub/mod.py").unwrap();
        assert_eq!(raw, "https://raw.githubusercontent.com/u/r/dev/pkg/sub/mod.py");
    }

    #[test]
    fn test_raw_url_passes_through() {
        let url = "https://raw.githubusercontent.com/u/r/main/app.py";
        assert_eq!(github_raw_url(url).unwrap(), url);
    }

    #[test]
    fn test_non_github_url_is_invalid() {
        let err = github_raw_url("https://gitlab.com/u/r/-/blob/main/app.py").unwrap_err();
        assert!(matches!(err, CritiqueError::InvalidUrl(_)));

        let err = github_raw_url("   ").unwrap_err();
        assert!(matches!(err, CritiqueError::InvalidInput(_)));
    }

    #[test]
    fn test_source_kind_from_extension() {
        assert_eq!(
            SourceKind::from_url("https://github.com/u/r/blob/main/app.py").unwrap(),
            SourceKind::Script
        );
        assert_eq!(
            SourceKind::from_url("https://github.com/u/r/blob/main/Train.IPYNB?plain=1").unwrap(),
            SourceKind::Notebook
        );
        assert!(matches!(
            SourceKind::from_url("https://github.com/u/r/blob/main/README.md"),
            Err(CritiqueError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_script_content_is_kept_verbatim() {
        let doc = SourceDocument::from_content(SourceKind::Script, "print('hi')\n").unwrap();
        assert_eq!(doc.text, "print('hi')\n");
        assert!(doc.digest.is_none());
    }

    #[test]
    fn test_notebook_without_markdown_has_no_digest() {
        let nb = r#"{"nbformat":4,"cells":[{"cell_type":"code","source":"x = 1"}]}"#;
        let doc = SourceDocument::from_content(SourceKind::Notebook, nb).unwrap();
        assert_eq!(doc.text, "x = 1\n\n");
        assert!(doc.digest.is_none());
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsupported_format_without_network() {
        let source = GitHubSource::new(reqwest::Client::new());
        let err = source
            .fetch("https://github.com/u/r/blob/main/notes.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, CritiqueError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_foreign_host_without_network() {
        let source = GitHubSource::new(reqwest::Client::new());
        let err = source
            .fetch("https://example.com/project/app.py")
            .await
            .unwrap_err();
        assert!(matches!(err, CritiqueError::InvalidUrl(_)));
    }
}
