//! Token-bounded, overlapping chunking of source documents.
//!
//! Windows of `chunk_size` tokens are taken from the encoded source,
//! advancing by `chunk_size - overlap` each time until the window start
//! passes the end of the stream. Each window is mapped back to its byte
//! span in the source and tagged with its source and zero-based ordinal.
//!
//! A token edge may fall inside a multi-byte character. Both edges of a
//! window snap back to the previous character boundary, so a cut between
//! two windows lands at the same place for both and the spans still tile
//! the source.

use super::tokenizer::Tokenizer;
use crate::config::ChunkerConfig;
use crate::error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A token-bounded slice of one source text. Never mutated after creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// `"{source_id}_chunk_{ordinal}"`, unique within a run.
    pub id: String,
    pub source_id: String,
    pub ordinal: usize,
    pub text: String,
    pub token_count: usize,
    /// Token offset (inclusive) of this window in the source stream.
    pub start_token: usize,
    /// Token offset (exclusive) of this window in the source stream.
    pub end_token: usize,
    /// Byte span of `text` in the source.
    pub start_byte: usize,
    pub end_byte: usize,
}

/// A document to be chunked.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SourceDocument {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

impl SourceDocument {
    /// Title and content joined by a blank line, or the content alone.
    pub fn full_text(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => format!("{title}\n\n{}", self.content),
            _ => self.content.clone(),
        }
    }
}

/// Split `source_text` into overlapping windows.
///
/// Fails with [`ContextError::Configuration`](crate::error::ContextError::Configuration)
/// when `overlap >= chunk_size`.
pub fn chunk(
    tokenizer: &dyn Tokenizer,
    source_text: &str,
    source_id: &str,
    chunk_size: usize,
    overlap: usize,
) -> ContextResult<Vec<Chunk>> {
    ChunkerConfig {
        chunk_size,
        overlap,
    }
    .validate()?;

    let tokens = tokenizer.encode(source_text);
    let mut offsets = Vec::with_capacity(tokens.len() + 1);
    offsets.push(0);
    for bytes in tokenizer.token_bytes(&tokens) {
        let last = offsets.last().copied().unwrap_or(0);
        offsets.push(last + bytes.len());
    }
    let stride = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(tokens.len() / stride + 1);

    let mut start = 0;
    while start < tokens.len() {
        let end = (start + chunk_size).min(tokens.len());
        let ordinal = chunks.len();
        let start_byte = floor_char_boundary(source_text, offsets[start]);
        let end_byte = floor_char_boundary(source_text, offsets[end]);
        let text = source_text.get(start_byte..end_byte).ok_or_else(|| {
            ContextError::Tokenizer(format!(
                "window {ordinal} of {source_id} maps to invalid byte span {start_byte}..{end_byte}"
            ))
        })?;
        chunks.push(Chunk {
            id: format!("{source_id}_chunk_{ordinal}"),
            source_id: source_id.to_string(),
            ordinal,
            text: text.to_string(),
            token_count: end - start,
            start_token: start,
            end_token: end,
            start_byte,
            end_byte,
        });
        start += stride;
    }

    debug!(
        "chunked {source_id}: {} tokens -> {} chunks (size={chunk_size}, overlap={overlap})",
        tokens.len(),
        chunks.len()
    );
    Ok(chunks)
}

/// The largest char boundary of `text` at or before `index`.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// A configured chunker bound to a tokenizer.
pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, config: ChunkerConfig) -> ContextResult<Self> {
        config.validate()?;
        Ok(Self { tokenizer, config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn chunk(&self, source_text: &str, source_id: &str) -> ContextResult<Vec<Chunk>> {
        chunk(
            self.tokenizer.as_ref(),
            source_text,
            source_id,
            self.config.chunk_size,
            self.config.overlap,
        )
    }

    /// Chunk every document in order, preserving per-document provenance.
    pub fn chunk_documents(&self, documents: &[SourceDocument]) -> ContextResult<Vec<Chunk>> {
        let mut all = Vec::new();
        for doc in documents {
            all.extend(self.chunk(&doc.full_text(), &doc.id)?);
        }
        Ok(all)
    }
}
