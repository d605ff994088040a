//! Correctness judges.
//!
//! Both judges satisfy the same contract: `(answer, ground_truth, question)`
//! in, a boolean [`Verdict`] out. [`SubstringJudge`] is a case-insensitive
//! containment test. [`LlmJudge`] asks the model for a YES/NO verdict.
//!
//! When the LLM judge call fails, [`JudgeFallback`] decides what happens.
//! `Propagate` (default) turns the failure into a strategy error for that
//! step. `Substring` substitutes the containment test and sets
//! [`Verdict::fallback_used`], because containment is more permissive for
//! verbose answers and stricter for paraphrases; mixed verdicts are not
//! directly comparable.

use crate::api::model::{ModelClient, ModelRequest, invoke_with_timeout};
use crate::error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub type JudgeFuture<'a> = Pin<Box<dyn Future<Output = ContextResult<Verdict>> + Send + 'a>>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    pub explanation: String,
    /// Full judge response; empty for the substring judge.
    pub raw: String,
    /// Set when the LLM judge failed and the substring check stood in.
    pub fallback_used: bool,
}

pub trait Judge: Send + Sync {
    fn judge<'a>(
        &'a self,
        answer: &'a str,
        ground_truth: &'a str,
        question: &'a str,
    ) -> JudgeFuture<'a>;

    fn name(&self) -> &'static str;
}

/// Which judge grades answers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JudgeKind {
    Llm,
    Substring,
}

impl FromStr for JudgeKind {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(JudgeKind::Llm),
            "substring" => Ok(JudgeKind::Substring),
            other => Err(ContextError::Configuration(format!(
                "unknown judge: {other}. Choose from llm, substring"
            ))),
        }
    }
}

/// Policy for a failed LLM judge call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JudgeFallback {
    /// Record the failure as a strategy error.
    #[default]
    Propagate,
    /// Grade with [`SubstringJudge`] and flag the verdict.
    Substring,
}

impl FromStr for JudgeFallback {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "propagate" => Ok(JudgeFallback::Propagate),
            "substring" => Ok(JudgeFallback::Substring),
            other => Err(ContextError::Configuration(format!(
                "unknown judge fallback: {other}. Choose from propagate, substring"
            ))),
        }
    }
}

// ── Substring ─────────────────────────────────────────────────────

/// Correct when the ground truth occurs in the answer, ignoring case.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringJudge;

impl SubstringJudge {
    pub fn verdict(answer: &str, ground_truth: &str) -> Verdict {
        let truth = ground_truth.trim().to_lowercase();
        let is_correct = !truth.is_empty() && answer.to_lowercase().contains(&truth);
        let explanation = if is_correct {
            "ground truth found in answer".to_string()
        } else {
            "ground truth not found in answer".to_string()
        };
        Verdict {
            is_correct,
            explanation,
            raw: String::new(),
            fallback_used: false,
        }
    }
}

impl Judge for SubstringJudge {
    fn judge<'a>(
        &'a self,
        answer: &'a str,
        ground_truth: &'a str,
        _question: &'a str,
    ) -> JudgeFuture<'a> {
        Box::pin(async move { Ok(Self::verdict(answer, ground_truth)) })
    }

    fn name(&self) -> &'static str {
        "substring"
    }
}

// ── LLM ───────────────────────────────────────────────────────────

pub struct LlmJudge {
    model: Arc<dyn ModelClient>,
    max_tokens: u32,
    model_timeout: Duration,
    fallback: JudgeFallback,
}

impl LlmJudge {
    pub fn new(
        model: Arc<dyn ModelClient>,
        max_tokens: u32,
        model_timeout: Duration,
        fallback: JudgeFallback,
    ) -> Self {
        Self {
            model,
            max_tokens,
            model_timeout,
            fallback,
        }
    }

    pub fn build_prompt(answer: &str, ground_truth: &str, question: &str) -> String {
        format!(
            "You are evaluating whether an answer to a question is correct.\n\n\
             Question: {question}\n\n\
             Ground Truth Answer: {ground_truth}\n\n\
             Given Answer: {answer}\n\n\
             Is the given answer essentially correct compared to the ground truth? \
             The answer doesn't need to be word-for-word identical, but should convey \
             the same key information.\n\n\
             Respond in this format:\n\
             CORRECT: [YES or NO]\n\
             EXPLANATION: [brief explanation]"
        )
    }

    async fn grade(&self, answer: &str, ground_truth: &str, question: &str) -> ContextResult<Verdict> {
        let request =
            ModelRequest::new(Self::build_prompt(answer, ground_truth, question), self.max_tokens);
        match invoke_with_timeout(self.model.as_ref(), request, self.model_timeout).await {
            Ok(raw) => Ok(parse_verdict(&raw)),
            Err(e) => match self.fallback {
                JudgeFallback::Propagate => Err(ContextError::Judge(e.to_string())),
                JudgeFallback::Substring => {
                    warn!("judge call failed ({e}), grading by substring match");
                    let mut verdict = SubstringJudge::verdict(answer, ground_truth);
                    verdict.fallback_used = true;
                    verdict.explanation = format!("substring fallback: {}", verdict.explanation);
                    Ok(verdict)
                }
            },
        }
    }
}

impl Judge for LlmJudge {
    fn judge<'a>(
        &'a self,
        answer: &'a str,
        ground_truth: &'a str,
        question: &'a str,
    ) -> JudgeFuture<'a> {
        Box::pin(self.grade(answer, ground_truth, question))
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

/// Parse a `CORRECT: ... / EXPLANATION: ...` response. Correct when the
/// first line contains `YES` in any case.
pub fn parse_verdict(raw: &str) -> Verdict {
    let is_correct = raw
        .lines()
        .next()
        .is_some_and(|first| first.to_uppercase().contains("YES"));
    let explanation = raw
        .lines()
        .find_map(|line| line.trim().strip_prefix("EXPLANATION:"))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_default();
    Verdict {
        is_correct,
        explanation,
        raw: raw.to_string(),
        fallback_used: false,
    }
}

/// Build the configured judge.
pub fn create_judge(
    kind: JudgeKind,
    fallback: JudgeFallback,
    model: Arc<dyn ModelClient>,
    max_tokens: u32,
    model_timeout: Duration,
) -> Arc<dyn Judge> {
    match kind {
        JudgeKind::Llm => Arc::new(LlmJudge::new(model, max_tokens, model_timeout, fallback)),
        JudgeKind::Substring => Arc::new(SubstringJudge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[test]
    fn parses_yes_and_explanation() {
        let v = parse_verdict("CORRECT: YES\nEXPLANATION: Mentions the red jacket.");
        assert!(v.is_correct);
        assert_eq!(v.explanation, "Mentions the red jacket.");
    }

    #[test]
    fn yes_must_be_on_first_line() {
        let v = parse_verdict("CORRECT: NO\nEXPLANATION: YES is not the answer here.");
        assert!(!v.is_correct);
        assert!(parse_verdict("correct: yes").is_correct);
        assert_eq!(parse_verdict("").explanation, "");
    }

    #[test]
    fn substring_is_case_insensitive() {
        assert!(SubstringJudge::verdict("It was a RED jacket.", "red jacket").is_correct);
        assert!(!SubstringJudge::verdict("A blue coat.", "red jacket").is_correct);
        assert!(!SubstringJudge::verdict("anything", "  ").is_correct);
    }

    #[test]
    fn parses_judge_names() {
        assert_eq!("LLM".parse::<JudgeKind>().unwrap(), JudgeKind::Llm);
        assert_eq!("substring".parse::<JudgeFallback>().unwrap(), JudgeFallback::Substring);
        assert!("vote".parse::<JudgeKind>().is_err());
        assert_eq!(JudgeFallback::default(), JudgeFallback::Propagate);
    }

    #[tokio::test]
    async fn llm_judge_sends_all_three_fields() {
        let model = Arc::new(ScriptedModel::new().on("evaluating", "CORRECT: YES\nEXPLANATION: ok"));
        let judge = LlmJudge::new(model.clone(), 200, Duration::from_secs(5), JudgeFallback::Propagate);
        let v = judge.judge("a red jacket", "red jacket", "What color?").await.unwrap();
        assert!(v.is_correct);
        assert!(!v.fallback_used);

        let prompt = model.prompts().pop().unwrap();
        assert!(prompt.contains("Question: What color?"));
        assert!(prompt.contains("Ground Truth Answer: red jacket"));
        assert!(prompt.contains("Given Answer: a red jacket"));
    }

    #[tokio::test]
    async fn failed_judge_propagates_by_default() {
        let model = Arc::new(ScriptedModel::new().failing_on("evaluating"));
        let judge = LlmJudge::new(model, 200, Duration::from_secs(5), JudgeFallback::Propagate);
        let err = judge.judge("a", "b", "c").await.unwrap_err();
        assert!(matches!(err, ContextError::Judge(_)));
    }

    #[tokio::test]
    async fn substring_fallback_is_flagged() {
        let model = Arc::new(ScriptedModel::new().failing_on("evaluating"));
        let judge = LlmJudge::new(model, 200, Duration::from_secs(5), JudgeFallback::Substring);
        let v = judge.judge("It was a red jacket", "red jacket", "q").await.unwrap();
        assert!(v.is_correct);
        assert!(v.fallback_used);
        assert!(v.explanation.starts_with("substring fallback"));
    }
}
