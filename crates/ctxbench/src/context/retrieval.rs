//! Top-k selection over scored candidates.
//!
//! [`top_k`] scores every candidate against the query and keeps the `k`
//! best, descending by score. Ties keep their original order (the sort is
//! stable), and the candidate slice is never mutated. Scores are
//! recomputed on every call; nothing is cached between queries.

use super::chunker::Chunk;
use super::relevance::RelevanceScorer;
use std::sync::Arc;
use tracing::trace;

/// Anything that exposes text to score.
pub trait Retrievable {
    fn retrieval_text(&self) -> &str;
}

impl Retrievable for String {
    fn retrieval_text(&self) -> &str {
        self
    }
}

impl Retrievable for &str {
    fn retrieval_text(&self) -> &str {
        self
    }
}

impl Retrievable for Chunk {
    fn retrieval_text(&self) -> &str {
        &self.text
    }
}

/// A candidate paired with its score for one query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a, T> {
    pub item: &'a T,
    pub score: f64,
    /// Position of `item` in the original candidate slice.
    pub index: usize,
}

/// Score all `candidates` against `query` and return the `k` highest.
///
/// With `k >= candidates.len()` every candidate is returned in scored order.
pub fn top_k<'a, T: Retrievable>(
    candidates: &'a [T],
    query: &str,
    k: usize,
    scorer: &dyn RelevanceScorer,
) -> Vec<ScoredCandidate<'a, T>> {
    let mut scored: Vec<ScoredCandidate<'a, T>> = candidates
        .iter()
        .enumerate()
        .map(|(index, item)| ScoredCandidate {
            item,
            score: scorer.score(item.retrieval_text(), query),
            index,
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);

    trace!(
        "top_k: kept {} of {} candidates (scorer={})",
        scored.len(),
        candidates.len(),
        scorer.name()
    );
    scored
}

/// An in-memory index of chunks answering top-k queries.
pub struct RetrievalIndex {
    chunks: Vec<Chunk>,
    scorer: Arc<dyn RelevanceScorer>,
}

impl RetrievalIndex {
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self {
            chunks: Vec::new(),
            scorer,
        }
    }

    /// Take ownership of `chunks`, appending them after existing ones.
    pub fn add(&mut self, chunks: impl IntoIterator<Item = Chunk>) {
        self.chunks.extend(chunks);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredCandidate<'_, Chunk>> {
        top_k(&self.chunks, query, k, self.scorer.as_ref())
    }
}
