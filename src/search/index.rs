use super::tokenize::tokenize;
use crate::db::DbPwa;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

const NAME_BOOST: u32 = 3;
const SHORT_NAME_BOOST: u32 = 2;
const DESCRIPTION_BOOST: u32 = 1;

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub pwa: Arc<DbPwa>,
    pub score: u32,
}

/// Term -> (doc slot, boosted term frequency).
type Postings = BTreeMap<String, Vec<(usize, u32)>>;

/// Immutable inverted index over a snapshot of PWAs.
#[derive(Debug, Default)]
pub struct SearchIndex {
    docs: Vec<Arc<DbPwa>>,
    postings: Postings,
}

impl SearchIndex {
    pub fn build(pwas: Vec<DbPwa>) -> Self {
        let mut postings: Postings = BTreeMap::new();
        let docs: Vec<Arc<DbPwa>> = pwas.into_iter().map(Arc::new).collect();

        for (slot, pwa) in docs.iter().enumerate() {
            let mut weights: AHashMap<String, u32> = AHashMap::new();
            let fields = [
                (pwa.name.as_deref(), NAME_BOOST),
                (pwa.short_name.as_deref(), SHORT_NAME_BOOST),
                (pwa.description.as_deref(), DESCRIPTION_BOOST),
            ];
            for (text, boost) in fields {
                for term in tokenize(text.unwrap_or_default()) {
                    *weights.entry(term).or_default() += boost;
                }
            }
            for (term, weight) in weights {
                postings.entry(term).or_default().push((slot, weight));
            }
        }

        Self { docs, postings }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Every query token must match. The last token also matches as a prefix.
    pub fn query(&self, text: &str, limit: usize) -> Vec<SearchHit> {
        let tokens = tokenize(text);
        let Some((last, rest)) = tokens.split_last() else {
            return Vec::new();
        };

        let mut scores: Option<AHashMap<usize, u32>> = None;
        for token in rest {
            let matched = self.exact(token);
            scores = Some(intersect(scores, matched));
        }
        let matched = self.prefixed(last);
        let scores = intersect(scores, matched);

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(slot, score)| SearchHit {
                pwa: self.docs[slot].clone(),
                score,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.pwa.updated_at.cmp(&a.pwa.updated_at))
                .then_with(|| b.pwa.id.cmp(&a.pwa.id))
        });
        hits.truncate(limit);
        hits
    }

    fn exact(&self, token: &str) -> AHashMap<usize, u32> {
        let mut out = AHashMap::new();
        if let Some(list) = self.postings.get(token) {
            for &(slot, weight) in list {
                *out.entry(slot).or_default() += weight;
            }
        }
        out
    }

    fn prefixed(&self, prefix: &str) -> AHashMap<usize, u32> {
        let mut out = AHashMap::new();
        let terms = self
            .postings
            .range(prefix.to_string()..)
            .take_while(|(term, _)| term.starts_with(prefix));
        for (_, list) in terms {
            for &(slot, weight) in list {
                *out.entry(slot).or_default() += weight;
            }
        }
        out
    }
}

fn intersect(
    acc: Option<AHashMap<usize, u32>>,
    next: AHashMap<usize, u32>,
) -> AHashMap<usize, u32> {
    match acc {
        None => next,
        Some(acc) => acc
            .into_iter()
            .filter_map(|(slot, score)| next.get(&slot).map(|w| (slot, score + w)))
            .collect(),
    }
}
