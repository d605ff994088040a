//! Context building blocks shared by the strategies.
//!
//! 1. **[`tokenizer`]**: [`Tokenizer`] trait and the `cl100k_base`
//!    [`TiktokenTokenizer`]. Every token count in the crate goes through it.
//!
//! 2. **[`chunker`]**: overlapping, token-bounded [`Chunk`]s with
//!    provenance (source, ordinal, token span).
//!
//! 3. **[`relevance`]**: the [`RelevanceScorer`] contract with keyword and
//!    embedding implementations.
//!
//! 4. **[`retrieval`]**: stable [`top_k`] selection and an in-memory
//!    [`RetrievalIndex`].
//!
//! 5. **[`summarizer`]**: rolling summary state for Compress.
//!
//! 6. **[`budget`]**: [`ContextBudget`] accounting for what a strategy
//!    hands to the answering adapter.

pub mod budget;
pub mod chunker;
pub mod relevance;
pub mod retrieval;
pub mod summarizer;
pub mod tokenizer;

pub use budget::{ContextBudget, ContextUsage};
pub use chunker::{Chunk, Chunker, SourceDocument};
pub use relevance::{
    Embedder, EmbeddingScorer, HashingEmbedder, KeywordScorer, RelevanceScorer,
    cosine_similarity,
};
pub use retrieval::{Retrievable, RetrievalIndex, ScoredCandidate, top_k};
pub use summarizer::{Summarizer, SummaryMode};
pub use tokenizer::{TiktokenTokenizer, Tokenizer};
