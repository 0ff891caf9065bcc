use crate::config::ListingConfig;
use crate::db::{
    DbActorHandle, DbLighthouseReport, DbLighthouseSummary, DbPwa, LighthouseReportCreate,
    PwaListQuery, PwaPage, PwaPatch, PwaPatchEnvelope, PwaSort, PwaUpsert,
};
use crate::error::DirectoryError;
use crate::fetch::{ManifestFetcher, normalize_manifest_url};
use crate::identity::User;
use crate::lighthouse::LighthouseRunner;
use crate::notifications::{Notification, PushProvider};
use crate::pwa::listing::ListQuery;
use crate::search::SearchService;
use pwadir_manifest::{IssueCode, Manifest, ManifestIssue};
use pwadir_pagecache::{LIST_TAG, PageCache, pwa_tag};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub pwa: DbPwa,
    pub created: bool,
    /// Warning-severity validation issues.
    pub warnings: Vec<ManifestIssue>,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Updated(DbPwa),
    /// The manifest no longer validates; the PWA was hidden.
    Hidden { issues: Vec<ManifestIssue> },
}

struct LoadedManifest {
    manifest: Manifest,
    body: String,
    warnings: Vec<ManifestIssue>,
}

/// Everything that happens to a PWA row goes through here, so the page cache
/// and the search index stay in step with the database.
pub struct PwaService {
    db: DbActorHandle,
    fetcher: Arc<dyn ManifestFetcher>,
    lighthouse: Arc<dyn LighthouseRunner>,
    push: Arc<dyn PushProvider>,
    cache: Arc<PageCache>,
    search: Arc<SearchService>,
    listing: ListingConfig,
    new_app_topic: String,
    public_base: String,
}

pub struct PwaServiceParts {
    pub db: DbActorHandle,
    pub fetcher: Arc<dyn ManifestFetcher>,
    pub lighthouse: Arc<dyn LighthouseRunner>,
    pub push: Arc<dyn PushProvider>,
    pub cache: Arc<PageCache>,
    pub search: Arc<SearchService>,
    pub listing: ListingConfig,
    pub new_app_topic: String,
    pub public_base: String,
}

impl PwaService {
    pub fn new(parts: PwaServiceParts) -> Self {
        let PwaServiceParts {
            db,
            fetcher,
            lighthouse,
            push,
            cache,
            search,
            listing,
            new_app_topic,
            public_base,
        } = parts;
        Self {
            db,
            fetcher,
            lighthouse,
            push,
            cache,
            search,
            listing,
            new_app_topic,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn listing(&self) -> &ListingConfig {
        &self.listing
    }

    pub async fn submit(&self, manifest_url: &str, user: &User) -> Result<Submission, DirectoryError> {
        let url = normalize_manifest_url(manifest_url)?;
        let loaded = self.load_manifest(&url).await?;

        let upsert = build_upsert(&url, &loaded, user)?;
        let start_url = Url::parse(&upsert.start_url)?;
        let outcome = self.db.upsert_pwa(upsert).await?;
        info!(
            pwa_id = outcome.id,
            created = outcome.created,
            manifest_url = %url,
            user_id = %user.id,
            warnings = loaded.warnings.len(),
            "PWA submitted"
        );

        self.score(outcome.id, &start_url).await;
        self.invalidate(outcome.id);

        let pwa = self
            .db
            .get_pwa(outcome.id)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("PWA {}", outcome.id)))?;

        if outcome.created {
            self.announce(&pwa).await;
        }

        Ok(Submission {
            pwa,
            created: outcome.created,
            warnings: loaded.warnings,
        })
    }

    /// Re-fetches and re-scores an existing PWA.
    pub async fn refresh(&self, pwa_id: i64) -> Result<RefreshOutcome, DirectoryError> {
        let existing = self.get(pwa_id).await?;
        let url = Url::parse(&existing.manifest_url)?;

        let loaded = match self.load_manifest(&url).await {
            Ok(loaded) => loaded,
            Err(err) => {
                let Some(issues) = invalidating_issues(&err) else {
                    return Err(err);
                };
                self.set_visibility(pwa_id, false).await?;
                warn!(pwa_id, error = %err, "Manifest no longer valid, PWA hidden");
                return Ok(RefreshOutcome::Hidden { issues });
            }
        };

        let owner = User {
            id: existing.user_id.clone(),
            email: existing.user_email.clone(),
            name: None,
        };
        let upsert = build_upsert(&url, &loaded, &owner)?;
        let start_url = Url::parse(&upsert.start_url)?;
        self.db.upsert_pwa(upsert).await?;

        self.score(pwa_id, &start_url).await;
        self.invalidate(pwa_id);

        let pwa = self.get(pwa_id).await?;
        info!(pwa_id, "PWA refreshed");
        Ok(RefreshOutcome::Updated(pwa))
    }

    /// Any PWA, visible or not.
    pub async fn get(&self, id: i64) -> Result<DbPwa, DirectoryError> {
        self.db
            .get_pwa(id)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("PWA {id}")))
    }

    /// Hidden PWAs are reported as missing.
    pub async fn get_visible(&self, id: i64) -> Result<DbPwa, DirectoryError> {
        let pwa = self.get(id).await?;
        if pwa.visible {
            Ok(pwa)
        } else {
            Err(DirectoryError::not_found(format!("PWA {id}")))
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<PwaPage, DirectoryError> {
        self.db.list_pwas(query.resolve(&self.listing)).await
    }

    /// Newest visible PWAs for the feed.
    pub async fn feed(&self) -> Result<Vec<DbPwa>, DirectoryError> {
        let page = self
            .db
            .list_pwas(PwaListQuery {
                sort: PwaSort::Newest,
                offset: 0,
                limit: i64::from(self.listing.feed_size.max(1)),
            })
            .await?;
        Ok(page.items)
    }

    pub async fn delete(&self, id: i64) -> Result<(), DirectoryError> {
        if !self.db.delete_pwa(id).await? {
            return Err(DirectoryError::not_found(format!("PWA {id}")));
        }
        self.invalidate(id);
        info!(pwa_id = id, "PWA deleted");
        Ok(())
    }

    pub async fn set_visibility(&self, id: i64, visible: bool) -> Result<DbPwa, DirectoryError> {
        self.db
            .patch_pwa(PwaPatchEnvelope {
                id,
                patch: PwaPatch {
                    visible: Some(visible),
                },
            })
            .await?;
        self.invalidate(id);
        info!(pwa_id = id, visible, "PWA visibility changed");
        self.get(id).await
    }

    /// Report history, newest first.
    pub async fn reports(&self, pwa_id: i64) -> Result<Vec<DbLighthouseSummary>, DirectoryError> {
        self.get_visible(pwa_id).await?;
        self.db.list_lighthouse_reports(pwa_id).await
    }

    pub async fn latest_report(&self, pwa_id: i64) -> Result<DbLighthouseReport, DirectoryError> {
        self.get_visible(pwa_id).await?;
        self.db
            .latest_lighthouse_report(pwa_id)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Lighthouse report for PWA {pwa_id}")))
    }

    async fn load_manifest(&self, url: &Url) -> Result<LoadedManifest, DirectoryError> {
        let fetched = self.fetcher.fetch(url).await?;
        let manifest = Manifest::parse(&fetched.body, &fetched.url)?;
        let issues = manifest.validate();

        if issues.iter().any(ManifestIssue::is_error) {
            debug!(manifest_url = %url, ?issues, "Manifest rejected");
            return Err(DirectoryError::ManifestInvalid { issues });
        }

        Ok(LoadedManifest {
            manifest,
            body: fetched.body,
            warnings: issues,
        })
    }

    /// Best effort: a failed audit keeps the previous score.
    async fn score(&self, pwa_id: i64, start_url: &Url) {
        let outcome = match self.lighthouse.run(start_url).await {
            Ok(outcome) => outcome,
            Err(DirectoryError::LighthouseDisabled) => {
                debug!(pwa_id, "Lighthouse disabled, score left unchanged");
                return;
            }
            Err(e) => {
                warn!(pwa_id, start_url = %start_url, error = %e, "Lighthouse audit failed");
                return;
            }
        };

        let report = LighthouseReportCreate {
            pwa_id,
            score: outcome.score,
            report_json: outcome.report.to_string(),
        };
        if let Err(e) = self.db.insert_lighthouse_report(report).await {
            warn!(pwa_id, error = %e, "Storing Lighthouse report failed");
        }
    }

    async fn announce(&self, pwa: &DbPwa) {
        let notification = Notification {
            title: format!("New app: {}", pwa.display_name()),
            body: pwa
                .description
                .clone()
                .unwrap_or_else(|| pwa.start_url.clone()),
            icon: pwa.icon_url.clone(),
            click_action: Some(format!("{}/pwas/{}", self.public_base, pwa.id)),
        };

        match self.push.publish(&self.new_app_topic, &notification).await {
            Ok(()) => {}
            Err(DirectoryError::NotificationsDisabled) => {
                debug!(pwa_id = pwa.id, "Notifications disabled, new app not announced");
            }
            Err(e) => warn!(pwa_id = pwa.id, error = %e, "Announcing new app failed"),
        }
    }

    fn invalidate(&self, pwa_id: i64) {
        self.cache.invalidate_tag(&pwa_tag(pwa_id));
        self.cache.invalidate_tag(LIST_TAG);
        self.search.mark_stale();
    }
}

fn build_upsert(
    manifest_url: &Url,
    loaded: &LoadedManifest,
    user: &User,
) -> Result<PwaUpsert, DirectoryError> {
    let m = &loaded.manifest;
    let start_url = m.start_url.as_ref().ok_or_else(|| DirectoryError::ManifestInvalid {
        issues: vec![ManifestIssue::new(
            IssueCode::NoStartUrl,
            "start_url could not be resolved",
        )],
    })?;

    Ok(PwaUpsert {
        manifest_url: manifest_url.to_string(),
        start_url: start_url.to_string(),
        name: m.name.clone(),
        short_name: m.short_name.clone(),
        description: m.description.clone(),
        background_color: m.background_color.clone(),
        theme_color: m.theme_color.clone(),
        icon_url: m.best_icon().map(|icon| icon.src.to_string()),
        manifest_json: loaded.body.clone(),
        user_id: user.id.clone(),
        user_email: user.email.clone(),
    })
}

/// Errors meaning the listed manifest is no longer acceptable, as opposed to
/// a transient failure to reach it.
fn invalidating_issues(err: &DirectoryError) -> Option<Vec<ManifestIssue>> {
    match err {
        DirectoryError::ManifestInvalid { issues } => Some(issues.clone()),
        DirectoryError::ManifestParse(e) => Some(vec![ManifestIssue::new(
            IssueCode::Unreadable,
            format!("manifest no longer parses: {e}"),
        )]),
        DirectoryError::ManifestTooLarge { limit } => Some(vec![ManifestIssue::new(
            IssueCode::Unreadable,
            format!("manifest grew beyond {limit} bytes"),
        )]),
        _ => None,
    }
}
