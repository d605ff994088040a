//! The answering adapter: one model call per (context, query).

use crate::api::model::{ModelClient, ModelRequest, invoke_with_timeout};
use crate::config::AnswerConfig;
use crate::context::budget::{ContextBudget, ContextUsage};
use crate::context::tokenizer::Tokenizer;
use crate::error::ContextResult;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const ANSWER_PROMPT: &str =
    "Based on the following information, answer the question concisely and accurately.";

/// The raw answer plus what it cost.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Tokens of the context text actually sent (template excluded).
    pub context_tokens: usize,
    pub usage: ContextUsage,
    /// Wall-clock time of the model call alone.
    pub latency: Duration,
}

pub struct AnsweringAdapter {
    model: Arc<dyn ModelClient>,
    tokenizer: Arc<dyn Tokenizer>,
    config: AnswerConfig,
    budget: ContextBudget,
    model_timeout: Duration,
}

impl AnsweringAdapter {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tokenizer: Arc<dyn Tokenizer>,
        config: AnswerConfig,
        model_timeout: Duration,
    ) -> Self {
        let budget = config.budget();
        Self {
            model,
            tokenizer,
            config,
            budget,
            model_timeout,
        }
    }

    pub fn build_prompt(context: &str, query: &str) -> String {
        format!(
            "{ANSWER_PROMPT}\n\nContext:\n{context}\n\nQuestion: {query}\n\nAnswer (be brief and specific):"
        )
    }

    /// Ask the model once. No retry happens here.
    pub async fn answer(&self, context: &str, query: &str) -> ContextResult<Answer> {
        let usage = self.budget.measure(self.tokenizer.as_ref(), context);
        if let Some(advisory) = self.budget.advisory(&usage) {
            warn!("{advisory}");
        }
        debug!("answer: {}", usage.to_log_string());

        let request = ModelRequest::new(Self::build_prompt(context, query), self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let start = Instant::now();
        let text = invoke_with_timeout(self.model.as_ref(), request, self.model_timeout).await?;
        let latency = start.elapsed();

        Ok(Answer {
            text: text.trim().to_string(),
            context_tokens: usage.tokens,
            usage,
            latency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tokenizer::TiktokenTokenizer;
    use crate::testing::ScriptedModel;

    fn adapter(model: Arc<ScriptedModel>) -> AnsweringAdapter {
        AnsweringAdapter::new(
            model,
            Arc::new(TiktokenTokenizer::cl100k().unwrap()),
            AnswerConfig::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn wraps_context_and_query_in_template() {
        let model = Arc::new(ScriptedModel::new().on("red jacket", "  A red jacket.\n"));
        let answer = adapter(model.clone())
            .answer("Suspect wears a red jacket.", "What is the suspect wearing?")
            .await
            .unwrap();

        assert_eq!(answer.text, "A red jacket.");
        let prompt = model.prompts().pop().unwrap();
        assert!(prompt.contains("Context:\nSuspect wears a red jacket."));
        assert!(prompt.contains("Question: What is the suspect wearing?"));
        assert!(prompt.ends_with("Answer (be brief and specific):"));
    }

    #[tokio::test]
    async fn counts_only_context_tokens() {
        let tokenizer = TiktokenTokenizer::cl100k().unwrap();
        let context = "The window was broken from the outside.";
        let answer = adapter(Arc::new(ScriptedModel::new()))
            .answer(context, "How was the window broken?")
            .await
            .unwrap();
        assert_eq!(answer.context_tokens, tokenizer.count(context));
        assert_eq!(answer.usage.tokens, answer.context_tokens);
    }

    #[tokio::test]
    async fn empty_context_costs_nothing() {
        let answer = adapter(Arc::new(ScriptedModel::new()))
            .answer("", "Anything?")
            .await
            .unwrap();
        assert_eq!(answer.context_tokens, 0);
    }

    #[tokio::test]
    async fn model_failure_propagates_after_one_call() {
        let model = Arc::new(ScriptedModel::new().failing_on("Question"));
        let result = adapter(model.clone()).answer("ctx", "q").await;
        assert!(result.is_err());
        assert_eq!(model.calls(), 1);
    }
}
