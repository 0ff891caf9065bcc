use ahash::AHasher;
use std::hash::Hasher;
use std::sync::Arc;

/// Normalized request target; used verbatim as the cache key.
pub type PageKey = Arc<str>;

const DOMAIN_BODY: u8 = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct PageKeyGenerator;

impl PageKeyGenerator {
    /// Key of a request target. Query parameter order does not matter,
    /// empty pairs are dropped.
    pub fn for_request(path: &str, query: Option<&str>) -> PageKey {
        let mut pairs: Vec<&str> = query
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .collect();
        pairs.sort_unstable();

        let path = path.trim_end_matches('/');
        if pairs.is_empty() {
            return Arc::from(path);
        }
        Arc::from(format!("{path}?{}", pairs.join("&")))
    }

    /// Quoted strong ETag for a response body.
    pub fn etag(body: &[u8]) -> String {
        let mut hasher = AHasher::default();
        hasher.write_u8(DOMAIN_BODY);
        hasher.write(body);
        format!("\"{:016x}\"", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_order_produces_same_key() {
        assert_eq!(
            PageKeyGenerator::for_request("/pwas", Some("sort=score&start=32")),
            PageKeyGenerator::for_request("/pwas", Some("start=32&sort=score"))
        );
    }

    #[test]
    fn trailing_slash_and_empty_pairs_are_ignored() {
        assert_eq!(
            PageKeyGenerator::for_request("/pwas/", Some("&sort=score&")),
            PageKeyGenerator::for_request("/pwas", Some("sort=score"))
        );
    }

    #[test]
    fn different_paths_differ() {
        assert_ne!(
            PageKeyGenerator::for_request("/pwas/1", None),
            PageKeyGenerator::for_request("/pwas/2", None)
        );
    }

    #[test]
    fn key_is_the_normalized_target() {
        assert_eq!(
            &*PageKeyGenerator::for_request("/pwas/", Some("start=0&sort=name")),
            "/pwas?sort=name&start=0"
        );
        assert_eq!(&*PageKeyGenerator::for_request("/feed", None), "/feed");
    }

    #[test]
    fn etag_is_quoted_and_content_sensitive() {
        let a = PageKeyGenerator::etag(b"alpha");
        assert!(a.starts_with('"') && a.ends_with('"'));
        assert_eq!(a, PageKeyGenerator::etag(b"alpha"));
        assert_ne!(a, PageKeyGenerator::etag(b"beta"));
    }
}
