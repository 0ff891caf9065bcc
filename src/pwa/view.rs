//! JSON documents served for listing, detail and API routes.

use crate::db::{DbLighthouseSummary, DbPwa, PwaPage, PwaSort};
use chrono::{DateTime, Utc};
use pwadir_manifest::ManifestIssue;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PwaSummary {
    pub id: i64,
    pub display_name: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub start_url: String,
    pub manifest_url: String,
    pub icon_url: Option<String>,
    pub background_color: Option<String>,
    pub theme_color: Option<String>,
    pub lighthouse_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DbPwa> for PwaSummary {
    fn from(p: &DbPwa) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name().to_string(),
            name: p.name.clone(),
            short_name: p.short_name.clone(),
            description: p.description.clone(),
            start_url: p.start_url.clone(),
            manifest_url: p.manifest_url.clone(),
            icon_url: p.icon_url.clone(),
            background_color: p.background_color.clone(),
            theme_color: p.theme_color.clone(),
            lighthouse_score: p.lighthouse_score,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PwaDetail {
    #[serde(flatten)]
    pub summary: PwaSummary,
    pub visible: bool,
    /// Stored manifest, parsed back into JSON (`null` if it no longer parses).
    pub manifest: Value,
    pub latest_report: Option<DbLighthouseSummary>,
}

impl PwaDetail {
    pub fn new(pwa: &DbPwa, latest_report: Option<DbLighthouseSummary>) -> Self {
        Self {
            summary: PwaSummary::from(pwa),
            visible: pwa.visible,
            manifest: serde_json::from_str(&pwa.manifest_json).unwrap_or(Value::Null),
            latest_report,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PwaListPage {
    pub items: Vec<PwaSummary>,
    pub total: i64,
    pub sort: PwaSort,
    pub start: i64,
    pub limit: i64,
    /// Offset of the following page, absent on the last one.
    pub next_start: Option<i64>,
}

impl PwaListPage {
    pub fn new(page: &PwaPage, sort: PwaSort, start: i64, limit: i64) -> Self {
        let end = start + page.items.len() as i64;
        Self {
            items: page.items.iter().map(PwaSummary::from).collect(),
            total: page.total,
            sort,
            start,
            limit,
            next_start: (end < page.total && !page.items.is_empty()).then_some(end),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub pwa: PwaSummary,
    pub created: bool,
    pub warnings: Vec<ManifestIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHitView {
    #[serde(flatten)]
    pub pwa: PwaSummary,
    pub score: u32,
}
