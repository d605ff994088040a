//! Benchmark output: per-step rows, per-strategy aggregates, persistence.
//!
//! The log is append-only. A cancelled run still holds a valid prefix of
//! fully completed steps and is saved the same way as a finished one.

use super::answer::Answer;
use super::judge::Verdict;
use crate::error::{ContextError, ContextResult};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Characters of context kept in [`StrategyOutcome::context_preview`].
pub const CONTEXT_PREVIEW_CHARS: usize = 200;

/// First [`CONTEXT_PREVIEW_CHARS`] characters, `...`-suffixed when cut.
pub fn context_preview(context: &str) -> String {
    if context.chars().count() > CONTEXT_PREVIEW_CHARS {
        let head: String = context.chars().take(CONTEXT_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        context.to_string()
    }
}

/// How one strategy did at one step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub strategy: String,
    pub answer: Option<String>,
    pub is_correct: bool,
    pub explanation: String,
    pub context_tokens: usize,
    /// Strategy processing, answer and judge, in seconds (two decimals).
    pub time_seconds: f64,
    /// The answering model call alone, in seconds (two decimals). Absent
    /// on error rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_latency_seconds: Option<f64>,
    #[serde(default)]
    pub context_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub judge_fallback_used: bool,
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

impl StrategyOutcome {
    pub fn succeeded(
        strategy: impl Into<String>,
        context: &str,
        answer: &Answer,
        verdict: &Verdict,
        elapsed: Duration,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            answer: Some(answer.text.clone()),
            is_correct: verdict.is_correct,
            explanation: verdict.explanation.clone(),
            context_tokens: answer.context_tokens,
            time_seconds: round_secs(elapsed),
            answer_latency_seconds: Some(round_secs(answer.latency)),
            context_preview: context_preview(context),
            error: None,
            judge_fallback_used: verdict.fallback_used,
        }
    }

    /// An error row: never correct, error text kept.
    pub fn failed(strategy: impl Into<String>, error: &ContextError, elapsed: Duration) -> Self {
        Self {
            strategy: strategy.into(),
            answer: None,
            is_correct: false,
            explanation: format!("Error: {error}"),
            context_tokens: 0,
            time_seconds: round_secs(elapsed),
            answer_latency_seconds: None,
            context_preview: String::new(),
            error: Some(error.to_string()),
            judge_fallback_used: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One row of the log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepResult {
    pub step: u32,
    pub span_id: String,
    pub question: String,
    pub ground_truth: String,
    pub history_length: usize,
    /// In configured strategy order.
    pub strategies: Vec<StrategyOutcome>,
}

impl StepResult {
    pub fn outcome(&self, strategy: &str) -> Option<&StrategyOutcome> {
        self.strategies.iter().find(|o| o.strategy == strategy)
    }
}

/// Aggregates for one strategy over a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StrategySummary {
    pub strategy: String,
    pub correct: usize,
    pub total: usize,
    /// `correct / total`; errors count as incorrect.
    pub accuracy: f64,
    /// Mean over outcomes without an error.
    pub mean_context_tokens: f64,
    /// Mean over outcomes without an error.
    pub mean_time_seconds: f64,
    /// Mean answering-call latency over outcomes without an error.
    #[serde(default)]
    pub mean_answer_latency_seconds: f64,
    pub errors: usize,
    pub judge_fallbacks: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BenchmarkLog {
    pub run_id: String,
    #[serde(rename = "scenario")]
    pub scenario_type: String,
    pub model: String,
    pub num_steps: usize,
    /// Local time the run started, `%Y%m%d_%H%M%S`.
    pub timestamp: String,
    #[serde(default)]
    pub cancelled: bool,
    pub results: Vec<StepResult>,
}

impl BenchmarkLog {
    pub fn new(
        run_id: impl Into<String>,
        scenario_type: impl Into<String>,
        model: impl Into<String>,
        num_steps: usize,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            scenario_type: scenario_type.into(),
            model: model.into(),
            num_steps,
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            cancelled: false,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn completed_steps(&self) -> usize {
        self.results.len()
    }

    /// One summary per strategy, in first-seen order.
    pub fn summaries(&self) -> Vec<StrategySummary> {
        let mut names: Vec<&str> = Vec::new();
        for outcome in self.results.iter().flat_map(|r| &r.strategies) {
            if !names.contains(&outcome.strategy.as_str()) {
                names.push(&outcome.strategy);
            }
        }

        names
            .into_iter()
            .map(|name| {
                let outcomes: Vec<&StrategyOutcome> = self
                    .results
                    .iter()
                    .filter_map(|r| r.outcome(name))
                    .collect();
                let ok: Vec<&&StrategyOutcome> = outcomes.iter().filter(|o| !o.is_error()).collect();
                let total = outcomes.len();
                let correct = outcomes.iter().filter(|o| o.is_correct).count();
                let mean = |f: fn(&StrategyOutcome) -> f64| {
                    if ok.is_empty() {
                        0.0
                    } else {
                        ok.iter().map(|o| f(o)).sum::<f64>() / ok.len() as f64
                    }
                };
                StrategySummary {
                    strategy: name.to_string(),
                    correct,
                    total,
                    accuracy: if total == 0 { 0.0 } else { correct as f64 / total as f64 },
                    mean_context_tokens: mean(|o| o.context_tokens as f64),
                    mean_time_seconds: mean(|o| o.time_seconds),
                    mean_answer_latency_seconds: mean(|o| {
                        o.answer_latency_seconds.unwrap_or_default()
                    }),
                    errors: total - ok.len(),
                    judge_fallbacks: outcomes.iter().filter(|o| o.judge_fallback_used).count(),
                }
            })
            .collect()
    }

    /// Plain-text table of [`summaries`](Self::summaries).
    pub fn summary_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<10} {:>9} {:>9} {:>12} {:>10} {:>12} {:>7}",
            "strategy", "accuracy", "correct", "avg tokens", "avg secs", "answer secs", "errors"
        );
        for s in self.summaries() {
            let _ = writeln!(
                out,
                "{:<10} {:>8.1}% {:>4}/{:<4} {:>12.1} {:>10.2} {:>12.2} {:>7}",
                s.strategy,
                s.accuracy * 100.0,
                s.correct,
                s.total,
                s.mean_context_tokens,
                s.mean_time_seconds,
                s.mean_answer_latency_seconds,
                s.errors
            );
        }
        if self.cancelled {
            let _ = writeln!(
                out,
                "(cancelled after {} of {} steps)",
                self.completed_steps(),
                self.num_steps
            );
        }
        out
    }

    pub fn file_name(&self) -> String {
        format!("experiment_results_{}.json", self.timestamp)
    }

    /// Write `experiment_results_<timestamp>.json` into `dir`.
    ///
    /// Writes to a temp file first, then renames into place.
    pub fn save(&self, dir: impl AsRef<Path>) -> ContextResult<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let final_path = dir.join(self.file_name());
        let tmp_path = dir.join(format!(".{}.tmp", self.file_name()));

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(final_path)
    }

    pub fn load(path: impl AsRef<Path>) -> ContextResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}
