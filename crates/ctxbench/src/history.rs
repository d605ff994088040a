//! The unfolding history a strategy is asked to manage.
//!
//! A [`HistoryStep`] is immutable once created. Steps arrive in strictly
//! increasing `step` order and are never retracted; the harness hands each
//! strategy a prefix of the full sequence via [`history_prefix`].

use serde::{Deserialize, Serialize};

/// One atomic event of a scenario.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryStep {
    /// 1-based position in the scenario.
    pub step: u32,
    /// Short label for what was done ("Interview witness").
    pub action: String,
    /// Free-text observation produced by the action.
    #[serde(alias = "observation")]
    pub observations: String,
    /// Opaque timestamp string ("Monday 9:30 AM").
    #[serde(alias = "timestamp")]
    pub time: String,
}

impl HistoryStep {
    pub fn new(
        step: u32,
        action: impl Into<String>,
        observations: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            step,
            action: action.into(),
            observations: observations.into(),
            time: time.into(),
        }
    }

    /// Render the step as a text block: action, observation and timestamp.
    ///
    /// Select, Compress and Write all consume history in this shape.
    pub fn render_block(&self) -> String {
        format!(
            "Step {}: {}\n{}\nTime: {}",
            self.step, self.action, self.observations, self.time
        )
    }
}

/// Join every step's block with blank lines, in history order.
pub fn render_history(history: &[HistoryStep]) -> String {
    history
        .iter()
        .map(HistoryStep::render_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The first `k` steps of `steps` (all of them if `k` exceeds the length).
///
/// A strategy evaluated at step `k` never receives step `k + 1`.
pub fn history_prefix(steps: &[HistoryStep], k: usize) -> &[HistoryStep] {
    &steps[..k.min(steps.len())]
}

/// Step number of the most recent step, or 0 for an empty history.
pub fn latest_step(history: &[HistoryStep]) -> u32 {
    history.last().map_or(0, |s| s.step)
}
