//! Rolling summary state for the Compress strategy.
//!
//! The default [`SummaryMode::FromScratch`] resummarizes the entire raw
//! history every time a new summary is needed. Facts the summarizer
//! chooses not to emphasize are gone for good once the raw history stops
//! being sent; that loss is what the benchmark measures.
//!
//! [`SummaryMode::Incremental`] instead merges only the steps since the last
//! summary into the existing one, in a single cheaper call.

use crate::history::{HistoryStep, render_history};
use serde::{Deserialize, Serialize};

/// Prompt for summarizing the full investigation history.
const FROM_SCRATCH_PROMPT: &str = "\
Summarize the following investigation steps concisely, preserving all key facts, \
names, times, locations, and evidence. Be specific and retain important details.";

/// Prompt for merging new steps into an existing summary.
const INCREMENTAL_PROMPT: &str = "\
Update the existing summary with the new investigation steps below. Preserve all key \
facts, names, times, locations, and evidence from both. Integrate and deduplicate; the \
result must be a standalone summary that replaces the existing one entirely.";

/// How a new rolling summary is produced.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// Summarize the whole raw history from scratch.
    #[default]
    FromScratch,
    /// Merge only the new steps into the existing summary.
    Incremental,
}

/// Rolling summary plus the step it covers up to.
#[derive(Debug, Default)]
pub struct Summarizer {
    /// The current rolling summary, if one has been generated.
    pub summary: Option<String>,
    /// Step number of the newest step covered by `summary` (0 = none).
    pub last_summarized_step: u32,
    pub mode: SummaryMode,
}

impl Summarizer {
    pub fn new(mode: SummaryMode) -> Self {
        Self {
            summary: None,
            last_summarized_step: 0,
            mode,
        }
    }

    /// Whether a summary covering `latest_step` must be (re)generated.
    pub fn needs_refresh(&self, latest_step: u32) -> bool {
        self.summary.is_none() || latest_step > self.last_summarized_step
    }

    /// Build the summarization prompt for `history`.
    ///
    /// In from-scratch mode (or before the first summary exists) the whole
    /// history is included; in incremental mode only steps newer than
    /// `last_summarized_step` are, prefixed by the existing summary.
    pub fn build_request(&self, history: &[HistoryStep]) -> String {
        match (self.mode, self.summary.as_deref()) {
            (SummaryMode::Incremental, Some(existing)) => {
                let fresh: Vec<HistoryStep> = history
                    .iter()
                    .filter(|s| s.step > self.last_summarized_step)
                    .cloned()
                    .collect();
                format!(
                    "{INCREMENTAL_PROMPT}\n\n=== EXISTING SUMMARY ===\n{existing}\n\n\
                     === NEW STEPS ===\n{}\n\nSummary:",
                    render_history(&fresh)
                )
            }
            _ => format!(
                "{FROM_SCRATCH_PROMPT}\n\nInvestigation Steps:\n{}\n\nSummary:",
                render_history(history)
            ),
        }
    }

    /// Record a new summary covering up to `step`.
    pub fn apply_summary(&mut self, new_summary: String, step: u32) {
        self.summary = Some(new_summary);
        self.last_summarized_step = step;
    }
}
