//! Query relevance scoring.
//!
//! Strategies only rely on "higher score means more relevant"; which
//! [`RelevanceScorer`] backs that is the caller's choice. Two are provided:
//!
//! - [`KeywordScorer`]: keyword overlap plus an exact-phrase bonus. The
//!   reference scorer and the default.
//! - [`EmbeddingScorer`]: cosine similarity over vectors from any
//!   [`Embedder`]. [`HashingEmbedder`] is a dependency-free embedder for
//!   offline runs; a neural embedder plugs in through the same trait.

use std::collections::HashMap;

/// Default minimum length (exclusive) of a query word to count.
pub const DEFAULT_MIN_WORD_CHARS: usize = 3;

/// Default bonus when the whole query appears verbatim in the candidate.
pub const DEFAULT_EXACT_MATCH_BONUS: f64 = 5.0;

/// Scores a candidate text against a query. Scores are `>= 0`.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, candidate: &str, query: &str) -> f64;

    fn name(&self) -> &str;
}

/// Counts query words (longer than `min_word_chars`) found as substrings
/// of the candidate, case-insensitively, and adds `exact_match_bonus` when
/// the full query occurs verbatim.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    pub min_word_chars: usize,
    pub exact_match_bonus: f64,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self {
            min_word_chars: DEFAULT_MIN_WORD_CHARS,
            exact_match_bonus: DEFAULT_EXACT_MATCH_BONUS,
        }
    }
}

impl RelevanceScorer for KeywordScorer {
    fn score(&self, candidate: &str, query: &str) -> f64 {
        let candidate = candidate.to_lowercase();
        let query = query.to_lowercase();

        let hits = query
            .split_whitespace()
            .filter(|w| w.chars().count() > self.min_word_chars && candidate.contains(w))
            .count();

        let mut score = hits as f64;
        if !query.is_empty() && candidate.contains(&query) {
            score += self.exact_match_bonus;
        }
        score
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Produces a dense vector for a text.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Cosine similarity between two vectors.
/// Returns 0.0 for mismatched, empty or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Cosine similarity between query and candidate embeddings, floored at 0.
pub struct EmbeddingScorer<E: Embedder> {
    embedder: E,
}

impl<E: Embedder> EmbeddingScorer<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }
}

impl<E: Embedder> RelevanceScorer for EmbeddingScorer<E> {
    fn score(&self, candidate: &str, query: &str) -> f64 {
        let c = self.embedder.embed(candidate);
        let q = self.embedder.embed(query);
        cosine_similarity(&c, &q).max(0.0)
    }

    fn name(&self) -> &str {
        "embedding"
    }
}

/// Term-frequency vectors hashed into fixed-dimension buckets (FNV-1a),
/// L2-normalized. Deterministic and always available.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h as usize) % dims
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut tf: HashMap<String, f32> = HashMap::new();
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() >= 2)
        {
            *tf.entry(term.to_lowercase()).or_default() += 1.0;
        }

        let mut vec = vec![0.0f32; self.dimensions];
        for (term, count) in &tf {
            // Longer terms carry more signal than short function words.
            let weight = 1.0 + (term.len() as f32).ln();
            vec[Self::bucket(term, self.dimensions)] += count * weight;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}
