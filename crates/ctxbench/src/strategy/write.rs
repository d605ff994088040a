//! Write: extract once, retrieve per query.
//!
//! Each new history step is turned into atomic facts by a single
//! extraction call and appended to the scratchpad. A step is extracted
//! exactly once no matter how often it is queried afterwards, and facts
//! are never removed. At answer time the facts are ranked against the
//! query and the top-n are returned under a fixed header.

use super::{ContextStrategy, StrategyFuture, StrategyKind};
use crate::api::model::{ModelClient, ModelRequest, invoke_with_timeout};
use crate::config::WriteConfig;
use crate::context::relevance::RelevanceScorer;
use crate::context::retrieval::{Retrievable, top_k};
use crate::error::{ContextError, ContextResult};
use crate::history::{HistoryStep, latest_step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const EXTRACTION_PROMPT: &str = "\
Extract key facts from this investigation step. List each fact as a separate bullet \
point. Include names, times, locations, actions, and evidence.";

/// An atomic statement extracted from exactly one step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub text: String,
    pub source_step: u32,
}

impl Retrievable for Fact {
    fn retrieval_text(&self) -> &str {
        &self.text
    }
}

/// Keep only list-item lines (`-`, `•`, or a leading digit) of an
/// extraction response, trimmed. Prose lines are dropped.
pub fn parse_fact_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with('-')
                || line.starts_with('•')
                || line.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .map(str::to_string)
        .collect()
}

pub struct WriteStrategy {
    config: WriteConfig,
    model: Arc<dyn ModelClient>,
    scorer: Arc<dyn RelevanceScorer>,
    model_timeout: Duration,
    scratchpad: Vec<Fact>,
    processed_steps: BTreeSet<u32>,
}

impl WriteStrategy {
    pub fn new(
        config: WriteConfig,
        model: Arc<dyn ModelClient>,
        scorer: Arc<dyn RelevanceScorer>,
        model_timeout: Duration,
    ) -> Self {
        Self {
            config,
            model,
            scorer,
            model_timeout,
            scratchpad: Vec::new(),
            processed_steps: BTreeSet::new(),
        }
    }

    pub fn scratchpad(&self) -> &[Fact] {
        &self.scratchpad
    }

    pub fn processed_steps(&self) -> &BTreeSet<u32> {
        &self.processed_steps
    }

    async fn extract(&self, step: &HistoryStep) -> ContextResult<Vec<Fact>> {
        let prompt = format!(
            "{EXTRACTION_PROMPT}\n\nStep:\n{}\n\nKey Facts (one per line, be specific):",
            step.render_block()
        );
        let request = ModelRequest::new(prompt, self.config.extraction_max_tokens);
        let response = invoke_with_timeout(self.model.as_ref(), request, self.model_timeout).await?;

        Ok(parse_fact_lines(&response)
            .into_iter()
            .map(|text| Fact {
                text,
                source_step: step.step,
            })
            .collect())
    }

    /// Extract every step not yet processed. Steps that succeed stay
    /// processed even if a later step's extraction fails.
    async fn absorb(&mut self, history: &[HistoryStep]) -> ContextResult<()> {
        let newest_seen = self.processed_steps.last().copied().unwrap_or(0);
        let current = latest_step(history);
        if current < newest_seen {
            return Err(ContextError::StaleState {
                step: current,
                last_seen: newest_seen,
            });
        }

        for step in history {
            if self.processed_steps.contains(&step.step) {
                continue;
            }
            let facts = self.extract(step).await?;
            debug!("write: step {} yielded {} facts", step.step, facts.len());
            self.scratchpad.extend(facts);
            self.processed_steps.insert(step.step);
        }
        Ok(())
    }

    /// The top-n facts for `query` under the header, or empty when the
    /// scratchpad is empty.
    pub fn retrieve(&self, query: &str) -> String {
        if self.scratchpad.is_empty() {
            return String::new();
        }
        let top = top_k(&self.scratchpad, query, self.config.top_n, self.scorer.as_ref());
        let lines: Vec<&str> = top.iter().map(|c| c.item.text.as_str()).collect();
        format!("{}\n{}", self.config.header, lines.join("\n"))
    }

    async fn write(&mut self, history: &[HistoryStep], query: &str) -> ContextResult<String> {
        if history.is_empty() {
            return Ok(String::new());
        }
        self.absorb(history).await?;
        Ok(self.retrieve(query))
    }
}

impl ContextStrategy for WriteStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Write
    }

    fn process<'a>(
        &'a mut self,
        history: &'a [HistoryStep],
        query: &'a str,
    ) -> StrategyFuture<'a> {
        Box::pin(self.write(history, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::relevance::KeywordScorer;
    use crate::testing::ScriptedModel;

    fn history() -> Vec<HistoryStep> {
        vec![
            HistoryStep::new(1, "Interview witness", "Suspect wears a red jacket.", "9:30"),
            HistoryStep::new(2, "Examine footage", "Suspect has long dark hair.", "10:00"),
        ]
    }

    fn model() -> Arc<ScriptedModel> {
        Arc::new(
            ScriptedModel::new()
                .on("red jacket", "Facts:\n- Suspect wears a red jacket\n- Seen at 9:30")
                .on("long dark hair", "1. Suspect has long dark hair"),
        )
    }

    fn strategy(model: Arc<ScriptedModel>) -> WriteStrategy {
        WriteStrategy::new(
            WriteConfig::default(),
            model,
            Arc::new(KeywordScorer::default()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn parses_only_list_lines() {
        let facts = parse_fact_lines("Here are the facts:\n - one\n• two\n3. three\n\nnote");
        assert_eq!(facts, vec!["- one", "• two", "3. three"]);
    }

    #[tokio::test]
    async fn each_step_is_extracted_once() {
        let model = model();
        let mut s = strategy(model.clone());
        let h = history();

        s.process(&h, "q").await.unwrap();
        let after_one = s.scratchpad().len();
        s.process(&h, "q").await.unwrap();

        assert_eq!(s.scratchpad().len(), after_one);
        assert_eq!(after_one, 3);
        assert_eq!(model.calls(), 2);
        assert_eq!(s.processed_steps().len(), 2);
    }

    #[tokio::test]
    async fn scratchpad_only_grows() {
        let model = model();
        let mut s = strategy(model.clone());
        let h = history();

        s.process(&h[..1], "q").await.unwrap();
        assert_eq!(s.scratchpad().len(), 2);
        assert_eq!(s.scratchpad()[0].source_step, 1);

        s.process(&h, "q").await.unwrap();
        assert_eq!(s.scratchpad().len(), 3);
        assert_eq!(s.scratchpad()[2].source_step, 2);
    }

    #[tokio::test]
    async fn retrieval_ranks_facts_under_header() {
        let mut s = strategy(model());
        let ctx = s.process(&history(), "What jacket was worn").await.unwrap();
        let mut lines = ctx.lines();
        assert_eq!(lines.next(), Some("Key Facts:"));
        assert_eq!(lines.next(), Some("- Suspect wears a red jacket"));
    }

    #[tokio::test]
    async fn top_n_limits_facts() {
        let mut s = WriteStrategy::new(
            WriteConfig {
                top_n: 1,
                ..Default::default()
            },
            model(),
            Arc::new(KeywordScorer::default()),
            Duration::from_secs(5),
        );
        let ctx = s.process(&history(), "hair").await.unwrap();
        assert_eq!(ctx.lines().count(), 2);
        assert!(ctx.contains("long dark hair"));
    }

    #[tokio::test]
    async fn empty_history_or_scratchpad_gives_empty_context() {
        let mut s = strategy(Arc::new(ScriptedModel::new().with_default("no list here")));
        assert_eq!(s.process(&[], "q").await.unwrap(), "");
        assert_eq!(s.process(&history(), "q").await.unwrap(), "");
        assert_eq!(s.processed_steps().len(), 2);
    }

    #[tokio::test]
    async fn failed_extraction_is_retried_next_call() {
        let model = Arc::new(
            ScriptedModel::new()
                .on("red jacket", "- red jacket")
                .failing_on("long dark hair"),
        );
        let mut s = strategy(model);
        assert!(s.process(&history(), "q").await.is_err());
        assert_eq!(s.processed_steps().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(s.scratchpad().len(), 1);
    }

    #[tokio::test]
    async fn older_prefix_after_newer_is_stale() {
        let mut s = strategy(model());
        s.process(&history(), "q").await.unwrap();
        let err = s.process(&history()[..1], "q").await.unwrap_err();
        assert!(matches!(err, ContextError::StaleState { .. }));
    }
}
