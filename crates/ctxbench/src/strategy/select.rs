//! Select: retrieval only.
//!
//! Every call re-renders one block per history step, scores each block
//! against the query and keeps the top-k in descending relevance. Nothing
//! carries over between calls, so there is no staleness to manage; the
//! price is O(|history|) scoring on every query.

use super::{ContextStrategy, StrategyFuture, StrategyKind};
use crate::config::SelectConfig;
use crate::context::relevance::RelevanceScorer;
use crate::context::retrieval::top_k;
use crate::history::HistoryStep;
use std::sync::Arc;
use tracing::debug;

pub struct SelectStrategy {
    config: SelectConfig,
    scorer: Arc<dyn RelevanceScorer>,
}

impl SelectStrategy {
    pub fn new(config: SelectConfig, scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { config, scorer }
    }

    /// The top-k blocks for `query`, joined by blank lines.
    pub fn select(&self, history: &[HistoryStep], query: &str) -> String {
        if history.is_empty() {
            return String::new();
        }

        let blocks: Vec<String> = history.iter().map(HistoryStep::render_block).collect();
        let top = top_k(&blocks, query, self.config.top_k, self.scorer.as_ref());

        debug!(
            "select: kept steps {:?} of {} (scores {:?})",
            top.iter().map(|c| history[c.index].step).collect::<Vec<_>>(),
            history.len(),
            top.iter().map(|c| c.score).collect::<Vec<_>>()
        );

        top.iter()
            .map(|c| c.item.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl ContextStrategy for SelectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Select
    }

    fn process<'a>(
        &'a mut self,
        history: &'a [HistoryStep],
        query: &'a str,
    ) -> StrategyFuture<'a> {
        Box::pin(async move { Ok(self.select(history, query)) })
    }
}
