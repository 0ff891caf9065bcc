use super::{FetchedManifest, ManifestFetcher, ensure_http};
use crate::config::FetchResolvedConfig;
use crate::error::{DirectoryError, IsRetryable};
use crate::utils::http::build_client;
use crate::utils::logging::body_preview;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const MANIFEST_ACCEPT: &str = "application/manifest+json, application/json;q=0.9, */*;q=0.1";

pub struct HttpManifestFetcher {
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
    max_body_bytes: usize,
}

impl HttpManifestFetcher {
    pub fn new(cfg: &FetchResolvedConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(
            &cfg.user_agent,
            cfg.proxy.as_ref(),
            cfg.enable_multiplexing,
            Duration::from_secs(cfg.timeout_secs),
        )?;
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(cfg.retry_max_times)
            .with_jitter();

        Ok(Self {
            client,
            retry_policy,
            max_body_bytes: cfg.max_body_bytes,
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedManifest, DirectoryError> {
        let mut resp = self
            .client
            .get(url.clone())
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let preview = resp.bytes().await.map(|b| body_preview(&b)).unwrap_or_default();
            debug!(%status, url = %url, body = %preview, "Manifest fetch rejected");
            return Err(DirectoryError::ManifestUnavailable(status));
        }

        let limit = self.max_body_bytes;
        if resp
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(DirectoryError::ManifestTooLarge { limit });
        }

        let final_url = resp.url().clone();
        let mut buf = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if buf.len() + chunk.len() > limit {
                return Err(DirectoryError::ManifestTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(FetchedManifest {
            url: final_url,
            body: String::from_utf8_lossy(&buf).into_owned(),
        })
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedManifest, DirectoryError> {
        ensure_http(url)?;

        let fetched = (|| self.fetch_once(url))
            .retry(self.retry_policy)
            .when(|e: &DirectoryError| e.is_retryable())
            .notify(|e, dur| {
                debug!(url = %url, error = %e, retry_in = ?dur, "Manifest fetch failed, retrying");
            })
            .await?;

        info!(
            url = %url,
            final_url = %fetched.url,
            bytes = fetched.body.len(),
            "Manifest fetched"
        );
        Ok(fetched)
    }
}
