use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::DirectoryError;

/// Abstraction for applying a patch payload to the database.
#[async_trait]
pub trait DbPatchable {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), DirectoryError>;
}

/// Everything derived from a freshly fetched manifest.
///
/// Keyed by `manifest_url`: an existing row keeps its id, `created_at` and submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwaUpsert {
    pub manifest_url: String,
    pub start_url: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub background_color: Option<String>,
    pub theme_color: Option<String>,
    pub icon_url: Option<String>,
    pub manifest_json: String,
    pub user_id: String,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub created: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PwaPatch {
    /// `None` => do not change; `Some(v)` => update
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwaPatchEnvelope {
    pub id: i64,
    pub patch: PwaPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LighthouseReportCreate {
    pub pwa_id: i64,
    pub score: i64,
    pub report_json: String,
}
