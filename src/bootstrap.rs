use crate::config::Config;
use crate::db::DbActorHandle;
use crate::favorites::FavoritesService;
use crate::fetch::{HttpManifestFetcher, ManifestFetcher};
use crate::identity::{GoogleIdentityVerifier, IdentityVerifier};
use crate::lighthouse::{LighthouseRunner, PsiLighthouseRunner};
use crate::notifications::{FcmPushProvider, PushProvider};
use crate::pwa::{PwaService, PwaServiceParts};
use crate::search::SearchService;
use crate::tasks::TaskQueue;
use pwadir_pagecache::PageCache;
use std::sync::Arc;
use tracing::info;

/// Network-facing collaborators, swappable for stubs in tests.
#[derive(Clone)]
pub struct Backends {
    pub fetcher: Arc<dyn ManifestFetcher>,
    pub lighthouse: Arc<dyn LighthouseRunner>,
    pub push: Arc<dyn PushProvider>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl Backends {
    pub fn from_config(cfg: &Config) -> Result<Self, reqwest::Error> {
        let defaults = &cfg.upstream.defaults;
        let fetch_cfg = cfg.fetch();
        let lighthouse_cfg = cfg.lighthouse();
        let notifications_cfg = cfg.notifications();
        let identity_cfg = cfg.identity();

        // Log resolved upstream configs here so `main` stays wiring-only.
        info!(
            upstream_defaults_proxy = %defaults.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
            upstream_defaults_enable_multiplexing = defaults.enable_multiplexing,
            upstream_defaults_retry_max_times = defaults.retry_max_times,
            "Upstream defaults loaded"
        );
        info!(
            fetch_proxy = %fetch_cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
            fetch_user_agent = %fetch_cfg.user_agent,
            fetch_timeout_secs = fetch_cfg.timeout_secs,
            fetch_max_body_bytes = fetch_cfg.max_body_bytes,
            fetch_retry_max_times = fetch_cfg.retry_max_times,
            "Manifest fetch config (effective)"
        );
        info!(
            lighthouse_enabled = lighthouse_cfg.enabled,
            lighthouse_api_url = %lighthouse_cfg.api_url,
            lighthouse_api_key_set = lighthouse_cfg.api_key.is_some(),
            lighthouse_timeout_secs = lighthouse_cfg.timeout_secs,
            "Lighthouse config (effective)"
        );
        info!(
            notifications_enabled = notifications_cfg.server_key.is_some(),
            notifications_iid_url = %notifications_cfg.iid_url,
            notifications_fcm_url = %notifications_cfg.fcm_url,
            notifications_new_app_topic = %notifications_cfg.new_app_topic,
            "Notifications config (effective)"
        );
        info!(
            identity_client_id = %identity_cfg.client_id.as_deref().unwrap_or("<any>"),
            identity_tokeninfo_url = %identity_cfg.tokeninfo_url,
            "Identity config (effective)"
        );

        Ok(Self {
            fetcher: Arc::new(HttpManifestFetcher::new(&fetch_cfg)?),
            lighthouse: Arc::new(PsiLighthouseRunner::new(&lighthouse_cfg)?),
            push: Arc::new(FcmPushProvider::new(&notifications_cfg)?),
            identity: Arc::new(GoogleIdentityVerifier::new(&identity_cfg)?),
        })
    }
}

/// Aggregates the services shared by the HTTP layer and the task worker.
///
/// Keep this a plain struct; every route knows statically what it needs.
#[derive(Clone)]
pub struct Services {
    pub db: DbActorHandle,
    pub pwa: Arc<PwaService>,
    pub search: Arc<SearchService>,
    pub cache: Arc<PageCache>,
    pub favorites: FavoritesService,
    pub tasks: TaskQueue,
    pub push: Arc<dyn PushProvider>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl Services {
    pub fn new(db: DbActorHandle, backends: Backends, cfg: &Config) -> Self {
        let cache = Arc::new(PageCache::new(cfg.cache.ttl_secs, cfg.cache.max_capacity));
        let search = Arc::new(SearchService::new(db.clone()));

        info!(
            cache_ttl_secs = cfg.cache.ttl_secs,
            cache_max_capacity = cfg.cache.max_capacity,
            listing_page_size = cfg.listing.page_size,
            listing_max_page_size = cfg.listing.max_page_size,
            "Page cache and listing config loaded"
        );

        let pwa = Arc::new(PwaService::new(PwaServiceParts {
            db: db.clone(),
            fetcher: backends.fetcher,
            lighthouse: backends.lighthouse,
            push: backends.push.clone(),
            cache: cache.clone(),
            search: search.clone(),
            listing: cfg.listing.clone(),
            new_app_topic: cfg.upstream.notifications.new_app_topic.clone(),
            public_base: cfg.basic.public_base().to_string(),
        }));

        Self {
            favorites: FavoritesService::new(db.clone()),
            tasks: TaskQueue::new(db.clone()),
            db,
            pwa,
            search,
            cache,
            push: backends.push,
            identity: backends.identity,
        }
    }
}
