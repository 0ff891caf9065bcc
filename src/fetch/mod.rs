//! Manifest retrieval.

mod http;

pub use http::HttpManifestFetcher;

use crate::error::DirectoryError;
use async_trait::async_trait;
use url::Url;

/// A manifest body as served, plus the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    /// Final URL after redirects; relative members resolve against it.
    pub url: Url,
    pub body: String,
}

#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedManifest, DirectoryError>;
}

/// Parses a submitted manifest URL: absolute `http(s)` only, fragment stripped.
pub fn normalize_manifest_url(raw: &str) -> Result<Url, DirectoryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DirectoryError::InvalidRequest(
            "manifest_url must not be empty".to_string(),
        ));
    }

    let mut url = Url::parse(raw)
        .map_err(|e| DirectoryError::InvalidRequest(format!("invalid manifest_url: {e}")))?;
    ensure_http(&url)?;
    url.set_fragment(None);
    Ok(url)
}

pub(crate) fn ensure_http(url: &Url) -> Result<(), DirectoryError> {
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        other => Err(DirectoryError::InvalidRequest(format!(
            "manifest_url must be an absolute http(s) URL, got scheme {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_stripped() {
        let url = normalize_manifest_url(" https://app.example/manifest.json#x ").unwrap();
        assert_eq!(url.as_str(), "https://app.example/manifest.json");
    }

    #[test]
    fn relative_and_non_http_urls_are_rejected() {
        assert!(matches!(
            normalize_manifest_url("/manifest.json"),
            Err(DirectoryError::InvalidRequest(_))
        ));
        assert!(matches!(
            normalize_manifest_url("ftp://example.com/manifest.json"),
            Err(DirectoryError::InvalidRequest(_))
        ));
        assert!(matches!(
            normalize_manifest_url("data:application/json,{}"),
            Err(DirectoryError::InvalidRequest(_))
        ));
    }
}
