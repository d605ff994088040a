//! Context strategies: three ways to shrink a growing history into a
//! bounded context for one query.
//!
//! | Strategy | Per-query work | Cross-step state |
//! |----------|----------------|------------------|
//! | [`SelectStrategy`] | re-rank every history block | none |
//! | [`CompressStrategy`] | raw history below threshold, cached summary above | rolling summary |
//! | [`WriteStrategy`] | extract new steps once, re-rank facts | append-only scratchpad |
//!
//! All three implement [`ContextStrategy`]. Instances are created per
//! benchmark run with [`create_strategy`] and owned exclusively by the run,
//! so no locking is needed even when a step evaluates them concurrently.

pub mod compress;
pub mod select;
pub mod write;

pub use compress::CompressStrategy;
pub use select::SelectStrategy;
pub use write::{Fact, WriteStrategy, parse_fact_lines};

use crate::api::model::ModelClient;
use crate::config::BenchConfig;
use crate::context::relevance::RelevanceScorer;
use crate::context::tokenizer::Tokenizer;
use crate::error::{ContextError, ContextResult};
use crate::history::HistoryStep;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by [`ContextStrategy::process`].
pub type StrategyFuture<'a> = Pin<Box<dyn Future<Output = ContextResult<String>> + Send + 'a>>;

/// Decides what part of `history` the model sees for `query`.
///
/// `history` is always a prefix of the scenario ending at the step being
/// evaluated. Implementations may keep state between calls but must give
/// the same answer when called twice with the same history and no new
/// steps in between.
pub trait ContextStrategy: Send {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Build the context text for `query`.
    fn process<'a>(&'a mut self, history: &'a [HistoryStep], query: &'a str)
    -> StrategyFuture<'a>;
}

/// The available strategies.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Select,
    Compress,
    Write,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Select,
        StrategyKind::Compress,
        StrategyKind::Write,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Select => "select",
            StrategyKind::Compress => "compress",
            StrategyKind::Write => "write",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "select" => Ok(StrategyKind::Select),
            "compress" => Ok(StrategyKind::Compress),
            "write" => Ok(StrategyKind::Write),
            other => Err(ContextError::Configuration(format!(
                "unknown strategy: {other}. Choose from select, compress, write"
            ))),
        }
    }
}

/// Shared capabilities injected into strategies.
#[derive(Clone)]
pub struct StrategyDeps {
    pub model: Arc<dyn ModelClient>,
    pub scorer: Arc<dyn RelevanceScorer>,
    pub tokenizer: Arc<dyn Tokenizer>,
    /// Timeout applied to every model call a strategy makes.
    pub model_timeout: Duration,
}

/// Build a fresh strategy instance with empty state.
pub fn create_strategy(
    kind: StrategyKind,
    config: &BenchConfig,
    deps: &StrategyDeps,
) -> Box<dyn ContextStrategy> {
    match kind {
        StrategyKind::Select => Box::new(SelectStrategy::new(
            config.select.clone(),
            deps.scorer.clone(),
        )),
        StrategyKind::Compress => Box::new(CompressStrategy::new(
            config.compress.clone(),
            deps.model.clone(),
            deps.tokenizer.clone(),
            deps.model_timeout,
        )),
        StrategyKind::Write => Box::new(WriteStrategy::new(
            config.write.clone(),
            deps.model.clone(),
            deps.scorer.clone(),
            deps.model_timeout,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::relevance::KeywordScorer;
    use crate::context::tokenizer::TiktokenTokenizer;
    use crate::testing::ScriptedModel;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("SELECT".parse::<StrategyKind>().unwrap(), StrategyKind::Select);
        assert_eq!(" compress ".parse::<StrategyKind>().unwrap(), StrategyKind::Compress);
        assert_eq!("Write".parse::<StrategyKind>().unwrap(), StrategyKind::Write);
    }

    #[test]
    fn unknown_name_is_configuration_error() {
        let err = "rerank".parse::<StrategyKind>().unwrap_err();
        assert!(matches!(err, ContextError::Configuration(_)));
        assert!(err.to_string().contains("rerank"));
    }

    #[test]
    fn factory_builds_each_kind() {
        let deps = StrategyDeps {
            model: Arc::new(ScriptedModel::new()),
            scorer: Arc::new(KeywordScorer::default()),
            tokenizer: Arc::new(TiktokenTokenizer::cl100k().unwrap()),
            model_timeout: Duration::from_secs(1),
        };
        let config = BenchConfig::default();
        for kind in StrategyKind::ALL {
            let strategy = create_strategy(kind, &config, &deps);
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.name(), kind.as_str());
        }
    }
}
