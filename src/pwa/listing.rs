use crate::config::ListingConfig;
use crate::db::{PwaListQuery, PwaSort};
use serde::{Deserialize, Serialize};

/// Listing parameters as they arrive in a query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort: PwaSort,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Applies the configured default and cap to `limit`. A zero limit counts as unset.
    pub fn resolve(&self, cfg: &ListingConfig) -> PwaListQuery {
        let max = cfg.max_page_size.max(1);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(cfg.page_size)
            .clamp(1, max);

        PwaListQuery {
            sort: self.sort,
            offset: i64::from(self.start.unwrap_or(0)),
            limit: i64::from(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ListingConfig {
        ListingConfig {
            page_size: 32,
            max_page_size: 100,
            feed_size: 20,
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        let q = ListQuery::default().resolve(&cfg());
        assert_eq!(q.sort, PwaSort::Newest);
        assert_eq!(q.offset, 0);
        assert_eq!(q.limit, 32);
    }

    #[test]
    fn limit_is_clamped_and_zero_means_default() {
        let big = ListQuery {
            limit: Some(5000),
            ..Default::default()
        };
        assert_eq!(big.resolve(&cfg()).limit, 100);

        let zero = ListQuery {
            limit: Some(0),
            start: Some(64),
            sort: PwaSort::Score,
        };
        let q = zero.resolve(&cfg());
        assert_eq!(q.limit, 32);
        assert_eq!(q.offset, 64);
        assert_eq!(q.sort, PwaSort::Score);
    }
}
