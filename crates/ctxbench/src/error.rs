//! Error taxonomy shared by every component.
//!
//! Failures fall into three groups:
//!
//! - **Configuration** errors (bad chunk/overlap sizes, zero budgets,
//!   unknown strategy names). Fatal at startup and never retried.
//! - **External call** failures ([`ModelUnavailable`](ContextError::ModelUnavailable),
//!   [`RateLimited`](ContextError::RateLimited), [`Timeout`](ContextError::Timeout),
//!   [`Judge`](ContextError::Judge)). The benchmark harness records these
//!   per strategy per step and keeps going.
//! - [`StaleState`](ContextError::StaleState) signals a programming defect:
//!   a strategy was handed history older than what it already consumed.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("judge error: {0}")]
    Judge(String),

    #[error("stale state: history ends at step {step} but step {last_seen} was already consumed")]
    StaleState { step: u32, last_seen: u32 },

    #[error("benchmark run cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContextError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Only consulted by [`RetryingModel`](crate::api::retry::RetryingModel);
    /// nothing inside the strategies retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ContextError::RateLimited(_) | ContextError::ModelUnavailable(_) | ContextError::Timeout(_)
        )
    }

    /// Whether this is a failure of a remote collaborator (model or judge).
    pub fn is_external(&self) -> bool {
        self.is_transient() || matches!(self, ContextError::Judge(_))
    }
}

pub type ContextResult<T> = Result<T, ContextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ContextError::RateLimited("429".into()).is_transient());
        assert!(ContextError::ModelUnavailable("503".into()).is_transient());
        assert!(ContextError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!ContextError::Configuration("bad".into()).is_transient());
        assert!(!ContextError::Judge("parse".into()).is_transient());
    }

    #[test]
    fn judge_failures_are_external_but_not_transient() {
        let err = ContextError::Judge("boom".into());
        assert!(err.is_external());
        assert!(!ContextError::Cancelled.is_external());
    }

    #[test]
    fn stale_state_message_names_both_steps() {
        let msg = ContextError::StaleState {
            step: 2,
            last_seen: 5,
        }
        .to_string();
        assert!(msg.contains("step 2"));
        assert!(msg.contains("step 5"));
    }
}
