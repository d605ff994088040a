//! The benchmark state machine.
//!
//! `NotStarted → Step(1) → … → Step(N) → Completed`, or `Cancelled` when
//! the [`CancellationFlag`] is raised. At step K every strategy receives
//! the history prefix `steps[..K]` and the question of step K, its context
//! is answered and judged, and one [`StepResult`] is appended once all
//! strategies are done. A strategy failing at a step becomes an error row
//! for that strategy only; the other strategies and later steps still run.
//!
//! Strategies of one step share no state, so with `parallel_strategies`
//! they are driven together with `join_all`. Results are assembled in
//! configured order either way.
//!
//! Cancellation interrupts in-flight model calls. The interrupted step is
//! dropped whole, so the log only ever holds fully completed steps.

use super::answer::{Answer, AnsweringAdapter};
use super::events::{BenchmarkEvent, EventHandler};
use super::judge::{Judge, Verdict, create_judge};
use super::report::{BenchmarkLog, StepResult, StrategyOutcome};
use super::scenario::{Scenario, ScenarioProbe};
use crate::api::tracing::{generate_trace_id, step_span_id};
use crate::config::BenchConfig;
use crate::error::{ContextError, ContextResult};
use crate::history::{HistoryStep, history_prefix};
use crate::strategy::{ContextStrategy, StrategyDeps, create_strategy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{error, info};

/// Shared stop signal. Clones observe the same flag.
///
/// Raising it interrupts in-flight evaluations: each one races its model
/// calls against [`cancelled`](Self::cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<CancelState>);

#[derive(Debug, Default)]
struct CancelState {
    raised: AtomicBool,
    notify: Notify,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.raised.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.raised.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the check so a concurrent cancel is not missed.
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Step(u32),
    Completed,
    Cancelled,
}

/// Drives every configured strategy through one scenario.
pub struct Benchmark {
    scenario: Scenario,
    config: BenchConfig,
    strategies: Vec<Box<dyn ContextStrategy>>,
    adapter: AnsweringAdapter,
    judge: Arc<dyn Judge>,
    state: RunState,
}

struct Evaluation {
    strategy: &'static str,
    result: ContextResult<(String, Answer, Verdict)>,
    elapsed: Duration,
}

impl Benchmark {
    /// Validate `config` and `scenario` and create fresh strategy state.
    ///
    /// Every model call uses `config.model_timeout`; the timeout carried
    /// by `deps` is replaced.
    pub fn new(scenario: Scenario, config: BenchConfig, deps: StrategyDeps) -> ContextResult<Self> {
        config.validate()?;
        scenario.validate()?;

        let deps = StrategyDeps {
            model_timeout: config.model_timeout,
            ..deps
        };
        let strategies = config
            .strategies
            .iter()
            .map(|kind| create_strategy(*kind, &config, &deps))
            .collect();
        let adapter = AnsweringAdapter::new(
            deps.model.clone(),
            deps.tokenizer.clone(),
            config.answer.clone(),
            config.model_timeout,
        );
        let judge = create_judge(
            config.judge,
            config.judge_fallback,
            deps.model.clone(),
            config.judge_max_tokens,
            config.model_timeout,
        );

        Ok(Self {
            scenario,
            config,
            strategies,
            adapter,
            judge,
            state: RunState::NotStarted,
        })
    }

    /// Replace the configured judge.
    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = judge;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Run every step once, in order. A benchmark runs at most once.
    ///
    /// On cancellation the returned log holds only fully completed steps
    /// and has `cancelled` set.
    pub async fn run(
        &mut self,
        handler: &dyn EventHandler,
        cancel: &CancellationFlag,
    ) -> ContextResult<BenchmarkLog> {
        if self.state != RunState::NotStarted {
            return Err(ContextError::Configuration(
                "benchmark already ran; create a new one to rerun".into(),
            ));
        }

        let run_id = generate_trace_id();
        let num_steps = self.scenario.num_steps();
        let mut log = BenchmarkLog::new(
            &run_id,
            &self.scenario.scenario_type,
            &self.config.model,
            num_steps,
        );
        let names: Vec<&'static str> = self.strategies.iter().map(|s| s.name()).collect();
        handler.on_event(&BenchmarkEvent::RunStarted {
            run_id: &run_id,
            scenario_type: &self.scenario.scenario_type,
            num_steps,
            strategies: &names,
        });

        let scenario = &self.scenario;
        let adapter = &self.adapter;
        let judge = self.judge.as_ref();

        for k in 1..=num_steps {
            if cancel.is_cancelled() {
                break;
            }
            let step = k as u32;
            self.state = RunState::Step(step);

            let history = history_prefix(&scenario.steps, k);
            let probe = scenario.probe(k).ok_or_else(|| {
                ContextError::Configuration(format!("scenario has no question for step {k}"))
            })?;
            handler.on_event(&BenchmarkEvent::StepStarted {
                step,
                num_steps,
                question: probe.question,
            });

            let evaluations = if self.config.parallel_strategies {
                let futures = self.strategies.iter_mut().map(|strategy| {
                    evaluate_strategy(strategy.as_mut(), history, probe, adapter, judge, cancel)
                });
                futures::future::join_all(futures).await
            } else {
                let mut evaluations = Vec::with_capacity(self.strategies.len());
                for strategy in self.strategies.iter_mut() {
                    evaluations.push(
                        evaluate_strategy(strategy.as_mut(), history, probe, adapter, judge, cancel)
                            .await,
                    );
                }
                evaluations
            };

            // A step interrupted by cancellation is dropped whole.
            if evaluations
                .iter()
                .any(|e| matches!(e.result, Err(ContextError::Cancelled)))
            {
                break;
            }

            let mut outcomes = Vec::with_capacity(evaluations.len());
            for evaluation in evaluations {
                let outcome = match evaluation.result {
                    Ok((context, answer, verdict)) => {
                        let outcome = StrategyOutcome::succeeded(
                            evaluation.strategy,
                            &context,
                            &answer,
                            &verdict,
                            evaluation.elapsed,
                        );
                        handler.on_event(&BenchmarkEvent::StrategyFinished {
                            step,
                            outcome: &outcome,
                        });
                        outcome
                    }
                    Err(e) => {
                        if matches!(e, ContextError::StaleState { .. }) {
                            error!("{} saw stale history at step {step}: {e}", evaluation.strategy);
                        }
                        handler.on_event(&BenchmarkEvent::StrategyFailed {
                            step,
                            strategy: evaluation.strategy,
                            error: &e,
                        });
                        StrategyOutcome::failed(evaluation.strategy, &e, evaluation.elapsed)
                    }
                };
                outcomes.push(outcome);
            }

            let result = StepResult {
                step,
                span_id: step_span_id(&run_id, step),
                question: probe.question.to_string(),
                ground_truth: probe.ground_truth.to_string(),
                history_length: history.len(),
                strategies: outcomes,
            };
            handler.on_event(&BenchmarkEvent::StepCompleted(&result));
            log.push(result);
        }

        if log.completed_steps() < num_steps {
            self.state = RunState::Cancelled;
            log.cancelled = true;
            handler.on_event(&BenchmarkEvent::RunCancelled {
                completed_steps: log.completed_steps(),
            });
        } else {
            self.state = RunState::Completed;
            info!("[{run_id}] all {num_steps} steps completed");
        }
        handler.on_event(&BenchmarkEvent::RunCompleted(&log));
        Ok(log)
    }
}

/// Process, answer and judge for one strategy at one step.
///
/// Returns [`ContextError::Cancelled`] as soon as `cancel` is raised, even
/// while a model call is in flight.
async fn evaluate_strategy(
    strategy: &mut dyn ContextStrategy,
    history: &[HistoryStep],
    probe: ScenarioProbe<'_>,
    adapter: &AnsweringAdapter,
    judge: &dyn Judge,
    cancel: &CancellationFlag,
) -> Evaluation {
    let name = strategy.name();
    let start = Instant::now();

    let work = async {
        let context = strategy.process(history, probe.question).await?;
        let answer = adapter.answer(&context, probe.question).await?;
        let verdict = judge
            .judge(&answer.text, probe.ground_truth, probe.question)
            .await?;
        Ok::<_, ContextError>((context, answer, verdict))
    };
    let result: ContextResult<(String, Answer, Verdict)> = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ContextError::Cancelled),
        done = work => done,
    };

    Evaluation {
        strategy: name,
        result,
        elapsed: start.elapsed(),
    }
}
