use super::{LighthouseOutcome, LighthouseRunner, extract_outcome};
use crate::config::LighthouseResolvedConfig;
use crate::error::DirectoryError;
use crate::utils::http::build_client;
use crate::utils::logging::body_preview;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

/// Runs audits through a PageSpeed Insights v5 compatible endpoint.
///
/// No retries: a single audit already takes tens of seconds.
pub struct PsiLighthouseRunner {
    client: Option<reqwest::Client>,
    api_url: Url,
    api_key: Option<String>,
}

impl PsiLighthouseRunner {
    pub fn new(cfg: &LighthouseResolvedConfig) -> Result<Self, reqwest::Error> {
        let client = if cfg.enabled {
            Some(build_client(
                concat!("pwadir/", env!("CARGO_PKG_VERSION")),
                cfg.proxy.as_ref(),
                cfg.enable_multiplexing,
                Duration::from_secs(cfg.timeout_secs),
            )?)
        } else {
            None
        };

        Ok(Self {
            client,
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    fn request_url(&self, start_url: &Url) -> Url {
        let mut url = self.api_url.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("url", start_url.as_str());
            q.append_pair("category", "pwa");
            if let Some(key) = &self.api_key {
                q.append_pair("key", key);
            }
        }
        url
    }
}

#[async_trait]
impl LighthouseRunner for PsiLighthouseRunner {
    async fn run(&self, start_url: &Url) -> Result<LighthouseOutcome, DirectoryError> {
        let client = self
            .client
            .as_ref()
            .ok_or(DirectoryError::LighthouseDisabled)?;

        let start = Instant::now();
        let resp = client.get(self.request_url(start_url)).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            warn!(
                %status,
                start_url = %start_url,
                body = %body_preview(&bytes),
                "Lighthouse runner returned an error"
            );
            return Err(DirectoryError::UpstreamStatus(status));
        }

        let body: Value = serde_json::from_slice(&bytes)?;
        let outcome = extract_outcome(body)?;
        info!(
            start_url = %start_url,
            score = outcome.score,
            took_ms = start.elapsed().as_millis() as u64,
            "Lighthouse audit finished"
        );
        Ok(outcome)
    }
}
