//! Configuration types for strategies and the [`Benchmark`](crate::bench::Benchmark).
//!
//! Every config has reference defaults and a `validate()` that rejects bad
//! values with [`ContextError::Configuration`] before a run starts.
//!
//! # Examples
//!
//! ```ignore
//! let config = BenchConfig::new("openai/gpt-4o-mini")
//!     .with_top_k(3)
//!     .with_compress_threshold(2000)
//!     .with_model_timeout(Duration::from_secs(60));
//! config.validate()?;
//! ```
//!
//! Setting struct fields directly:
//!
//! ```ignore
//! let config = BenchConfig {
//!     compress: CompressConfig {
//!         mode: SummaryMode::Incremental,
//!         ..Default::default()
//!     },
//!     ..BenchConfig::new("openai/gpt-4o-mini")
//! };
//! ```

use crate::bench::judge::{JudgeFallback, JudgeKind};
use crate::context::budget::{ContextBudget, DEFAULT_CONTEXT_WINDOW};
use crate::context::summarizer::SummaryMode;
use crate::error::{ContextError, ContextResult};
use crate::strategy::StrategyKind;
use std::collections::HashSet;
use std::time::Duration;

/// Default model for all LLM calls.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default timeout for a single model call.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

// ── Chunker ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Window size in tokens. Default: `500`.
    pub chunk_size: usize,
    /// Tokens shared by consecutive windows. Default: `50`.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> ContextResult<()> {
        if self.chunk_size == 0 {
            return Err(ContextError::Configuration(
                "chunk_size must be at least 1 token".into(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ContextError::Configuration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ── Strategies ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectConfig {
    /// History blocks kept per query. Default: `3`.
    pub top_k: usize,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressConfig {
    /// Raw-history token count above which summarization kicks in. Default: `2000`.
    pub max_tokens: usize,
    /// Output cap for the summarization call. Default: `800`.
    pub summary_max_tokens: u32,
    /// Default: [`SummaryMode::FromScratch`].
    pub mode: SummaryMode,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            summary_max_tokens: 800,
            mode: SummaryMode::FromScratch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConfig {
    /// Facts retrieved per query. Default: `10`.
    pub top_n: usize,
    /// Output cap for each extraction call. Default: `300`.
    pub extraction_max_tokens: u32,
    /// Line placed above the retrieved facts. Default: `"Key Facts:"`.
    pub header: String,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            extraction_max_tokens: 300,
            header: "Key Facts:".to_string(),
        }
    }
}

// ── Answering ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerConfig {
    /// Default: `0.0`.
    pub temperature: f32,
    /// Output cap for the answer. Default: `150`.
    pub max_tokens: u32,
    /// Model context window used for budget accounting. Default: `128_000`.
    pub context_window: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 150,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl AnswerConfig {
    pub fn budget(&self) -> ContextBudget {
        ContextBudget::new(self.context_window).with_output_reserve(self.max_tokens as usize)
    }
}

// ── Benchmark ─────────────────────────────────────────────────────

/// Full configuration of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Model identifier recorded in results. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Strategies to evaluate, in result order. Default: select, compress, write.
    pub strategies: Vec<StrategyKind>,
    pub select: SelectConfig,
    pub compress: CompressConfig,
    pub write: WriteConfig,
    pub answer: AnswerConfig,
    /// Default: [`JudgeKind::Llm`].
    pub judge: JudgeKind,
    /// What to do when the LLM judge fails. Default: [`JudgeFallback::Propagate`].
    pub judge_fallback: JudgeFallback,
    /// Output cap for judge calls. Default: `200`.
    pub judge_max_tokens: u32,
    /// Per-call timeout for every model call. Default: 120 s. Zero disables.
    pub model_timeout: Duration,
    /// Evaluate the strategies of a step concurrently. Default: `true`.
    pub parallel_strategies: bool,
}

impl BenchConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            strategies: StrategyKind::ALL.to_vec(),
            select: SelectConfig::default(),
            compress: CompressConfig::default(),
            write: WriteConfig::default(),
            answer: AnswerConfig::default(),
            judge: JudgeKind::Llm,
            judge_fallback: JudgeFallback::Propagate,
            judge_max_tokens: 200,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            parallel_strategies: true,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.select.top_k = k;
        self
    }

    pub fn with_compress_threshold(mut self, max_tokens: usize) -> Self {
        self.compress.max_tokens = max_tokens;
        self
    }

    pub fn with_summary_mode(mut self, mode: SummaryMode) -> Self {
        self.compress.mode = mode;
        self
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.write.top_n = n;
        self
    }

    pub fn with_judge(mut self, judge: JudgeKind, fallback: JudgeFallback) -> Self {
        self.judge = judge;
        self.judge_fallback = fallback;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_parallel_strategies(mut self, parallel: bool) -> Self {
        self.parallel_strategies = parallel;
        self
    }

    /// Check every threshold and the strategy list.
    pub fn validate(&self) -> ContextResult<()> {
        if self.strategies.is_empty() {
            return Err(ContextError::Configuration(
                "at least one strategy must be enabled".into(),
            ));
        }
        let mut seen = HashSet::new();
        for kind in &self.strategies {
            if !seen.insert(kind) {
                return Err(ContextError::Configuration(format!(
                    "strategy '{kind}' listed more than once"
                )));
            }
        }
        if self.select.top_k == 0 {
            return Err(ContextError::Configuration("select top_k must be at least 1".into()));
        }
        if self.compress.max_tokens == 0 {
            return Err(ContextError::Configuration(
                "compress max_tokens must be at least 1".into(),
            ));
        }
        if self.compress.summary_max_tokens == 0 || self.write.extraction_max_tokens == 0 {
            return Err(ContextError::Configuration(
                "summary and extraction output caps must be at least 1".into(),
            ));
        }
        if self.write.top_n == 0 {
            return Err(ContextError::Configuration("write top_n must be at least 1".into()));
        }
        if self.answer.max_tokens == 0 || self.judge_max_tokens == 0 {
            return Err(ContextError::Configuration(
                "answer and judge output caps must be at least 1".into(),
            ));
        }
        self.answer.budget().validate()
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}
