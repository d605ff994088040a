//! Context budget accounting: how much of the model's window a strategy's
//! context consumes.
//!
//! The answering adapter measures every context it sends against a
//! [`ContextBudget`] and logs an advisory when usage crosses the warning
//! (60%) or critical (80%) threshold. Nothing is truncated here: a strategy
//! that overshoots is reported, not silently corrected, so the comparison
//! between strategies stays honest.

use super::tokenizer::Tokenizer;
use crate::error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};

/// Default context window size in tokens (gpt-4o-mini class models).
pub const DEFAULT_CONTEXT_WINDOW: usize = 128_000;

/// Threshold percentages at which to report context notices.
const WARNING_THRESHOLD: f64 = 0.60;
const CRITICAL_THRESHOLD: f64 = 0.80;

/// Maximum token count a strategy may hand to the answering adapter.
///
/// # Example
///
/// ```ignore
/// let budget = ContextBudget::new(16_000).with_output_reserve(150);
/// let usage = budget.measure(&tokenizer, &context);
/// if let Some(notice) = budget.advisory(&usage) {
///     tracing::warn!("{notice}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ContextBudget {
    /// Maximum context window in tokens.
    max_tokens: usize,
    /// Tokens reserved for model output (per-response token limit).
    output_reserve: usize,
    /// Tokens reserved for the fixed prompt template around the context.
    template_reserve: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW)
    }
}

impl ContextBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            output_reserve: 0,
            template_reserve: 0,
        }
    }

    /// Set tokens reserved for model output (the per-response max_tokens limit).
    pub fn with_output_reserve(mut self, tokens: usize) -> Self {
        self.output_reserve = tokens;
        self
    }

    /// Set tokens reserved for the prompt template.
    pub fn with_template_reserve(mut self, tokens: usize) -> Self {
        self.template_reserve = tokens;
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Effective budget: max_tokens minus reserves for output and template.
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens
            .saturating_sub(self.output_reserve)
            .saturating_sub(self.template_reserve)
    }

    /// Reject budgets that leave no room for context.
    pub fn validate(&self) -> ContextResult<()> {
        if self.effective_max_tokens() == 0 {
            return Err(ContextError::Configuration(format!(
                "context budget of {} tokens leaves no room after reserves ({} output, {} template)",
                self.max_tokens, self.output_reserve, self.template_reserve
            )));
        }
        Ok(())
    }

    /// Measure `context` with `tokenizer`.
    pub fn measure(&self, tokenizer: &dyn Tokenizer, context: &str) -> ContextUsage {
        self.usage_for(tokenizer.count(context))
    }

    /// Usage for an already-known token count.
    pub fn usage_for(&self, tokens: usize) -> ContextUsage {
        let effective = self.effective_max_tokens();
        let usage_pct = if effective > 0 {
            tokens as f64 / effective as f64
        } else {
            1.0
        };
        ContextUsage {
            tokens,
            max_tokens: effective,
            usage_pct,
        }
    }

    /// A notice if usage exceeds the warning or critical threshold.
    pub fn advisory(&self, usage: &ContextUsage) -> Option<String> {
        if usage.usage_pct > 1.0 {
            Some(format!(
                "[Context notice: context exceeds budget ({} tokens / {} max)]",
                usage.tokens, usage.max_tokens
            ))
        } else if usage.usage_pct >= CRITICAL_THRESHOLD {
            Some(format!(
                "[Context notice: ~{:.0}% of context budget used ({} tokens / {} max)]",
                usage.usage_pct * 100.0,
                usage.tokens,
                usage.max_tokens,
            ))
        } else if usage.usage_pct >= WARNING_THRESHOLD {
            Some(format!(
                "[Context notice: ~{:.0}% of context budget used]",
                usage.usage_pct * 100.0,
            ))
        } else {
            None
        }
    }
}

/// Snapshot of one context's budget consumption.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ContextUsage {
    /// Tokens in the context text.
    pub tokens: usize,
    /// Effective budget the tokens were measured against.
    pub max_tokens: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    pub fn over_budget(&self) -> bool {
        self.usage_pct > 1.0
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: {} tokens ({:.0}% of {})",
            self.tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tokenizer::TiktokenTokenizer;

    #[test]
    fn low_usage_no_advisory() {
        let budget = ContextBudget::new(1000);
        assert!(budget.advisory(&budget.usage_for(10)).is_none());
    }

    #[test]
    fn warning_and_critical_thresholds() {
        let budget = ContextBudget::new(1000);
        let warn = budget.advisory(&budget.usage_for(650)).unwrap();
        assert!(warn.contains("65%"));
        let crit = budget.advisory(&budget.usage_for(850)).unwrap();
        assert!(crit.contains("850 tokens"));
        let over = budget.advisory(&budget.usage_for(1200)).unwrap();
        assert!(over.contains("exceeds budget"));
    }

    #[test]
    fn effective_max_tokens_subtracts_reserves() {
        let budget = ContextBudget::new(2000)
            .with_output_reserve(150)
            .with_template_reserve(50);
        assert_eq!(budget.effective_max_tokens(), 1800);
        assert!(budget.validate().is_ok());
    }

    #[test]
    fn budget_without_room_is_a_configuration_error() {
        let budget = ContextBudget::new(100).with_output_reserve(100);
        assert_eq!(budget.effective_max_tokens(), 0);
        assert!(matches!(
            budget.validate(),
            Err(ContextError::Configuration(_))
        ));
    }

    #[test]
    fn measure_counts_tokens() {
        let tok = TiktokenTokenizer::cl100k().unwrap();
        let budget = ContextBudget::new(100);
        let usage = budget.measure(&tok, "hello world");
        assert_eq!(usage.tokens, tok.count("hello world"));
        assert!(!usage.over_budget());
        assert!(usage.to_log_string().contains("tokens"));
    }
}
