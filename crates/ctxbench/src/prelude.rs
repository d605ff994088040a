//! Convenience re-exports for common `ctxbench` types.
//!
//! ```ignore
//! use ctxbench::prelude::*;
//! ```
//!
//! Covers wiring a model, building strategies and running a benchmark.
//! Judges, report rows and the chunker live in their modules.

pub use std::sync::Arc;

// ── Core types ──────────────────────────────────────────────────────
pub use crate::OpenRouterClient;

// ── Model access ────────────────────────────────────────────────────
pub use crate::api::{ModelClient, ModelRequest, RetryConfig, RetryingModel};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::{
    BenchConfig, CompressConfig, DEFAULT_MODEL, DEFAULT_MODEL_TIMEOUT, SelectConfig, WriteConfig,
};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    ContextBudget, KeywordScorer, RelevanceScorer, SummaryMode, TiktokenTokenizer, Tokenizer,
};

// ── Strategies ──────────────────────────────────────────────────────
pub use crate::history::HistoryStep;
pub use crate::strategy::{ContextStrategy, StrategyDeps, StrategyKind, create_strategy};

// ── Benchmark ───────────────────────────────────────────────────────
pub use crate::bench::{
    Benchmark, BenchmarkEvent, BenchmarkLog, CancellationFlag, EventHandler, FnEventHandler,
    JudgeFallback, JudgeKind, LoggingHandler, NoopHandler, Scenario,
};

pub use crate::error::{ContextError, ContextResult};
