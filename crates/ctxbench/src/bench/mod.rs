//! Benchmark harness: drives every strategy over the same growing history
//! and scores the answers.
//!
//! - [`scenario`]: the fixture: steps, questions, ground truth.
//! - [`answer`]: [`AnsweringAdapter`], one model call per context.
//! - [`judge`]: [`SubstringJudge`], [`LlmJudge`] and the fallback policy.
//! - [`harness`]: the [`Benchmark`] state machine and cancellation.
//! - [`report`]: [`BenchmarkLog`] rows, summaries and JSON output.
//! - [`events`]: [`BenchmarkEvent`]s and handlers.

pub mod answer;
pub mod events;
pub mod harness;
pub mod judge;
pub mod report;
pub mod scenario;

pub use answer::{Answer, AnsweringAdapter};
pub use events::{BenchmarkEvent, EventHandler, FnEventHandler, LoggingHandler, NoopHandler};
pub use harness::{Benchmark, CancellationFlag, RunState};
pub use judge::{
    Judge, JudgeFallback, JudgeKind, LlmJudge, SubstringJudge, Verdict, create_judge,
    parse_verdict,
};
pub use report::{BenchmarkLog, StepResult, StrategyOutcome, StrategySummary};
pub use scenario::{Scenario, ScenarioProbe};
