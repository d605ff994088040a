//! Events emitted by the [`Benchmark`](super::harness::Benchmark) during a run.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |

use super::report::{BenchmarkLog, StepResult, StrategyOutcome};
use crate::error::ContextError;
use tracing::{info, warn};

#[derive(Debug)]
pub enum BenchmarkEvent<'a> {
    RunStarted {
        run_id: &'a str,
        scenario_type: &'a str,
        num_steps: usize,
        strategies: &'a [&'static str],
    },
    StepStarted {
        step: u32,
        num_steps: usize,
        question: &'a str,
    },
    /// A strategy produced an answer and a verdict.
    StrategyFinished {
        step: u32,
        outcome: &'a StrategyOutcome,
    },
    /// A strategy failed at this step; the run continues.
    StrategyFailed {
        step: u32,
        strategy: &'a str,
        error: &'a ContextError,
    },
    StepCompleted(&'a StepResult),
    /// Cancellation was observed; the log holds `completed_steps` rows.
    RunCancelled { completed_steps: usize },
    RunCompleted(&'a BenchmarkLog),
}

/// Observer for [`BenchmarkEvent`]s. The default does nothing.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &BenchmarkEvent<'_>) {
        let _ = event;
    }
}

pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let BenchmarkEvent::StepCompleted(result) = event {
///         println!("step {} done", result.step);
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&BenchmarkEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&BenchmarkEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&BenchmarkEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &BenchmarkEvent<'_>) {
        (self.0)(event)
    }
}

/// Forwards every event to `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &BenchmarkEvent<'_>) {
        match event {
            BenchmarkEvent::RunStarted {
                run_id,
                scenario_type,
                num_steps,
                strategies,
            } => {
                info!(
                    "[{run_id}] {scenario_type}: {num_steps} steps, strategies {}",
                    strategies.join(", ")
                );
            }
            BenchmarkEvent::StepStarted {
                step,
                num_steps,
                question,
            } => {
                info!("[step {step}/{num_steps}] {question}");
            }
            BenchmarkEvent::StrategyFinished { step, outcome } => {
                let status = if outcome.is_correct {
                    "CORRECT"
                } else {
                    "INCORRECT"
                };
                let answer = outcome.answer.as_deref().unwrap_or_default();
                let preview: String = answer.chars().take(120).collect();
                info!(
                    "  [{step}] {:<8} {status:<9} {} tokens, {:.2}s: {preview}{}",
                    outcome.strategy,
                    outcome.context_tokens,
                    outcome.time_seconds,
                    if answer.chars().count() > 120 { "..." } else { "" }
                );
                if outcome.judge_fallback_used {
                    warn!("  [{step}] {} graded by substring fallback", outcome.strategy);
                }
            }
            BenchmarkEvent::StrategyFailed {
                step,
                strategy,
                error,
            } => {
                warn!("  [{step}] {strategy} failed: {error}");
            }
            BenchmarkEvent::StepCompleted(result) => {
                let correct = result.strategies.iter().filter(|o| o.is_correct).count();
                info!(
                    "[step {}] {correct}/{} strategies correct (history {} steps)",
                    result.step,
                    result.strategies.len(),
                    result.history_length
                );
            }
            BenchmarkEvent::RunCancelled { completed_steps } => {
                warn!("Run cancelled after {completed_steps} completed steps");
            }
            BenchmarkEvent::RunCompleted(log) => {
                info!(
                    "[{}] finished {} of {} steps",
                    log.run_id,
                    log.completed_steps(),
                    log.num_steps
                );
            }
        }
    }
}
