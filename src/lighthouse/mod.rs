//! Lighthouse quality scoring.

mod psi;
mod score;

pub use psi::PsiLighthouseRunner;
pub use score::extract_outcome;

use crate::error::DirectoryError;
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

/// A finished audit.
#[derive(Debug, Clone, PartialEq)]
pub struct LighthouseOutcome {
    /// PWA category score, 0..=100.
    pub score: i64,
    /// The Lighthouse report itself (unwrapped from any API envelope).
    pub report: Value,
}

#[async_trait]
pub trait LighthouseRunner: Send + Sync {
    async fn run(&self, start_url: &Url) -> Result<LighthouseOutcome, DirectoryError>;
}
