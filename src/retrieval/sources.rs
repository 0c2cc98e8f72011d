use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::database::SearchHit;

/// A citation pointing back at one saved conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

/// Collapse ranked hits into one source per conversation url.
///
/// Hits arrive ordered by relevance and several chunks of the same chat often
/// match at once; the first occurrence wins so the source list keeps the
/// relevance order. Hits without a url are dropped rather than collapsed into
/// a single blank entry.
pub fn dedupe_sources(hits: &[SearchHit]) -> Vec<SourceRef> {
    hits.iter()
        .filter(|hit| !hit.metadata.url.is_empty())
        .unique_by(|hit| hit.metadata.url.clone())
        .map(|hit| SourceRef {
            title: hit.metadata.title.clone(),
            url: hit.metadata.url.clone(),
        })
        .collect()
}
