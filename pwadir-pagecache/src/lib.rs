pub mod engine;
pub mod fingerprint;

pub use engine::{CachedPage, PageCache, PageCacheStore};
pub use fingerprint::{PageKey, PageKeyGenerator};

/// Tag carried by every listing-style page (lists, exports, feeds).
pub const LIST_TAG: &str = "list";

/// Tag carried by pages that render a single PWA.
pub fn pwa_tag(id: i64) -> String {
    format!("pwa:{id}")
}
