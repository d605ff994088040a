//! Token counting and encoding.
//!
//! Budget accounting and chunk boundaries must be reproducible, so the
//! tokenizer is a fixed deterministic encoding. [`TiktokenTokenizer`] wraps
//! tiktoken's `cl100k_base` BPE, the encoding the GPT-4 family uses.

use crate::error::{ContextError, ContextResult};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// A deterministic text ⇄ token-id encoding.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn decode(&self, tokens: &[u32]) -> ContextResult<String>;

    /// Raw bytes of each token. Concatenated, they reproduce the encoded
    /// text byte for byte, even where a token ends inside a character.
    fn token_bytes(&self, tokens: &[u32]) -> Vec<Vec<u8>>;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// `cl100k_base` tokenizer.
#[derive(Clone)]
pub struct TiktokenTokenizer {
    bpe: Arc<CoreBPE>,
}

impl TiktokenTokenizer {
    /// Load the `cl100k_base` ranks (bundled with the crate, no network).
    pub fn cl100k() -> ContextResult<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ContextError::Tokenizer(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TiktokenTokenizer(cl100k_base)")
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> ContextResult<String> {
        self.bpe
            .decode(tokens.iter().map(|&t| t as _).collect())
            .map_err(|e| ContextError::Tokenizer(format!("decode failed: {e}")))
    }

    fn token_bytes(&self, tokens: &[u32]) -> Vec<Vec<u8>> {
        self.bpe._decode_native_and_split(tokens.to_vec()).collect()
    }

    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
