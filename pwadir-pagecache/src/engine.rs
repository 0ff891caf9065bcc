use crate::fingerprint::{PageKey, PageKeyGenerator};
use moka::sync::Cache;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// A rendered response body together with the tags used to invalidate it.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: Arc<[u8]>,
    pub content_type: &'static str,
    pub etag: Arc<str>,
    tags: Arc<[String]>,
}

impl CachedPage {
    pub fn new(body: impl Into<Arc<[u8]>>, content_type: &'static str, tags: Vec<String>) -> Self {
        let body = body.into();
        let etag = Arc::from(PageKeyGenerator::etag(&body));
        Self {
            body,
            content_type,
            etag,
            tags: tags.into(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

pub type PageCacheStore = Cache<PageKey, CachedPage>;

pub struct PageCache {
    cache: PageCacheStore,
    ttl: Duration,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

impl PageCache {
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs.max(1));
        let cache = PageCacheStore::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity.max(1))
            .support_invalidation_closures()
            .build();

        Self {
            cache,
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &PageKey) -> Option<CachedPage> {
        self.cache.get(key)
    }

    pub fn put(&self, key: PageKey, page: CachedPage) {
        self.cache.insert(key, page);
    }

    /// Current invalidation generation. Read it before rendering a page and
    /// hand it to [`PageCache::put_if_current`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `page` only if no invalidation ran since `generation` was read.
    /// Returns whether the page was kept.
    pub fn put_if_current(&self, key: PageKey, page: CachedPage, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.cache.insert(key.clone(), page);
        // An invalidation may have slipped in between the check and the insert.
        if self.generation() != generation {
            self.cache.invalidate(&key);
            return false;
        }
        true
    }

    /// Drops every page carrying `tag`.
    pub fn invalidate_tag(&self, tag: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let tag = tag.to_string();
        if self
            .cache
            .invalidate_entries_if(move |_, page| page.has_tag(&tag))
            .is_err()
        {
            self.cache.invalidate_all();
        }
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all();
    }

    /// Approximate entry count; pending maintenance may lag behind.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
