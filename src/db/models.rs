use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPwa {
    pub id: i64,
    pub manifest_url: String,
    pub start_url: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub background_color: Option<String>,
    pub theme_color: Option<String>,
    pub icon_url: Option<String>,
    /// Manifest body exactly as fetched.
    pub manifest_json: String,
    pub lighthouse_score: Option<i64>,
    /// Submitter (first one wins).
    pub user_id: String,
    pub user_email: Option<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbPwa {
    /// `name`, else `short_name`, else the manifest URL.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or(self.manifest_url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbLighthouseReport {
    pub id: i64,
    pub pwa_id: i64,
    pub score: i64,
    pub report_json: String,
    pub created_at: DateTime<Utc>,
}

/// Report history row without the (large) report body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbLighthouseSummary {
    pub id: i64,
    pub pwa_id: i64,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbTask {
    pub id: i64,
    pub pwa_id: i64,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
}

/// Listing order. Ties always break by id descending so pages stay stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PwaSort {
    #[default]
    Newest,
    Updated,
    Score,
    Name,
}

impl PwaSort {
    pub(crate) fn order_clause(self) -> &'static str {
        match self {
            PwaSort::Newest => "created_at DESC, id DESC",
            PwaSort::Updated => "updated_at DESC, id DESC",
            PwaSort::Score => "lighthouse_score IS NULL, lighthouse_score DESC, id DESC",
            PwaSort::Name => {
                "COALESCE(name, short_name, manifest_url) COLLATE NOCASE ASC, id DESC"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwaListQuery {
    pub sort: PwaSort,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PwaPage {
    pub items: Vec<DbPwa>,
    /// Number of visible PWAs, regardless of paging.
    pub total: i64,
}

/// Fingerprint of the visible data set: (max `updated_at`, count).
pub type IndexStamp = (Option<String>, i64);
