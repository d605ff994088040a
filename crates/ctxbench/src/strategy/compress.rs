//! Compress: raw history until it no longer fits, then a rolling summary.
//!
//! Below `max_tokens` the full raw history is returned verbatim and no
//! model call is made. Above it, a summary is generated only when the
//! newest step is newer than the last summarized one; otherwise the cached
//! summary is returned as-is. A failed summarization call is surfaced to
//! the caller. Falling back to truncated raw history would quietly change
//! what is being compared.

use super::{ContextStrategy, StrategyFuture, StrategyKind};
use crate::api::model::{ModelClient, ModelRequest, invoke_with_timeout};
use crate::config::CompressConfig;
use crate::context::summarizer::Summarizer;
use crate::context::tokenizer::Tokenizer;
use crate::error::{ContextError, ContextResult};
use crate::history::{HistoryStep, latest_step, render_history};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct CompressStrategy {
    config: CompressConfig,
    model: Arc<dyn ModelClient>,
    tokenizer: Arc<dyn Tokenizer>,
    model_timeout: Duration,
    summarizer: Summarizer,
    summarization_calls: usize,
}

impl CompressStrategy {
    pub fn new(
        config: CompressConfig,
        model: Arc<dyn ModelClient>,
        tokenizer: Arc<dyn Tokenizer>,
        model_timeout: Duration,
    ) -> Self {
        let summarizer = Summarizer::new(config.mode);
        Self {
            config,
            model,
            tokenizer,
            model_timeout,
            summarizer,
            summarization_calls: 0,
        }
    }

    pub fn rolling_summary(&self) -> Option<&str> {
        self.summarizer.summary.as_deref()
    }

    pub fn last_summarized_step(&self) -> u32 {
        self.summarizer.last_summarized_step
    }

    /// Number of summarization calls issued so far.
    pub fn summarization_calls(&self) -> usize {
        self.summarization_calls
    }

    async fn compress(&mut self, history: &[HistoryStep]) -> ContextResult<String> {
        if history.is_empty() {
            return Ok(String::new());
        }

        let raw = render_history(history);
        let tokens = self.tokenizer.count(&raw);
        if tokens <= self.config.max_tokens {
            debug!(
                "compress: {tokens} tokens <= {} threshold, passing raw history",
                self.config.max_tokens
            );
            return Ok(raw);
        }

        let current = latest_step(history);
        if self.summarizer.summary.is_some() && current < self.summarizer.last_summarized_step {
            return Err(ContextError::StaleState {
                step: current,
                last_seen: self.summarizer.last_summarized_step,
            });
        }

        if self.summarizer.needs_refresh(current) {
            let prompt = self.summarizer.build_request(history);
            let request = ModelRequest::new(prompt, self.config.summary_max_tokens);
            self.summarization_calls += 1;
            let summary =
                invoke_with_timeout(self.model.as_ref(), request, self.model_timeout).await?;
            info!(
                "compress: summarized {} steps ({tokens} tokens) into {} tokens",
                history.len(),
                self.tokenizer.count(&summary)
            );
            self.summarizer.apply_summary(summary, current);
        }

        Ok(self.summarizer.summary.clone().unwrap_or_default())
    }
}

impl ContextStrategy for CompressStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Compress
    }

    fn process<'a>(
        &'a mut self,
        history: &'a [HistoryStep],
        _query: &'a str,
    ) -> StrategyFuture<'a> {
        Box::pin(self.compress(history))
    }
}
