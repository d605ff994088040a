//! Context management strategies for long-running, multi-step LLM tasks,
//! and a harness that benchmarks them against the same evolving history.
//!
//! At every step of a task the history grows, but the model's context
//! does not. A [`ContextStrategy`](strategy::ContextStrategy) decides what
//! the model gets to see for the current question:
//!
//! - **Select** re-ranks every history step against the query and keeps
//!   the top-k.
//! - **Compress** passes raw history until a token threshold, then a
//!   rolling summary regenerated only when new steps arrive.
//! - **Write** extracts atomic facts from each step exactly once into an
//!   append-only scratchpad and retrieves the best ones per query.
//!
//! The [`Benchmark`](bench::Benchmark) feeds a scenario to every strategy
//! step by step, answers with the selected context, judges the answer
//! against ground truth and records accuracy, context tokens and latency.
//!
//! # Getting started
//!
//! ```ignore
//! use ctxbench::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ContextError> {
//!     let api_key = std::env::var("OPENROUTER_KEY").unwrap_or_default();
//!     let model: Arc<dyn ModelClient> = Arc::new(OpenRouterClient::new(api_key, DEFAULT_MODEL)?);
//!
//!     let deps = StrategyDeps {
//!         model,
//!         scorer: Arc::new(KeywordScorer::default()),
//!         tokenizer: Arc::new(TiktokenTokenizer::cl100k()?),
//!         model_timeout: DEFAULT_MODEL_TIMEOUT,
//!     };
//!     let scenario = Scenario::load("fixtures/detective_investigation.json")?;
//!
//!     let mut bench = Benchmark::new(scenario, BenchConfig::default(), deps)?;
//!     let log = bench.run(&LoggingHandler, &CancellationFlag::new()).await?;
//!     println!("{}", log.summary_table());
//!     log.save("results")?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`strategy`] | [`ContextStrategy`](strategy::ContextStrategy) trait, Select, Compress, Write, factory |
//! | [`context`] | Tokenizer, chunker, relevance scoring, top-k retrieval, rolling summary, budget |
//! | [`bench`] | Scenario fixtures, answering adapter, judges, harness, events, result log |
//! | [`api`] | [`ModelClient`](api::ModelClient) capability, timeouts, retry with backoff, run IDs |
//! | [`config`] | Per-strategy and benchmark configuration with validation |
//! | [`history`] | [`HistoryStep`](history::HistoryStep) and block rendering |
//! | [`error`] | [`ContextError`](error::ContextError) taxonomy |
//!
//! Model access is always injected. Nothing in the library reads
//! credentials or endpoints from the environment; [`OpenRouterClient`] is
//! one [`ModelClient`](api::ModelClient) implementation and the binary
//! builds it.

pub mod api;
pub mod bench;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod prelude;
pub mod strategy;

#[cfg(test)]
mod testing;

use api::model::{ModelClient, ModelFuture, ModelRequest};
use error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Transport-level ceiling for one HTTP request. Per-call timeouts are
/// applied above this by [`invoke_with_timeout`](api::invoke_with_timeout).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. A zero `max_tokens` is omitted.
#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    pub temperature: f32,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// One chat message. Every prompt in this crate is a single user turn.
#[derive(Serialize, Clone, Debug)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Clean return type from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    /// The model stopped because it hit `max_tokens`.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Turn a successful response body into a [`ChatCompletion`].
fn parse_completion(text: &str) -> ContextResult<ChatCompletion> {
    let parsed: RawChatResponse = serde_json::from_str(text)
        .map_err(|e| ContextError::ModelUnavailable(format!("failed to parse response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(ContextError::ModelUnavailable(format!(
            "OpenRouter API error: {}",
            err.message
        )));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    let (content, finish_reason) = match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => (c.message.content, c.finish_reason),
        None => (None, None),
    };
    Ok(ChatCompletion {
        content,
        usage: parsed.usage,
        finish_reason,
    })
}

// ── Client ─────────────────────────────────────────────────────────

/// Map a non-success HTTP status to the error taxonomy.
fn status_error(status: reqwest::StatusCode, body: &str) -> ContextError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ContextError::RateLimited(format!("HTTP {status}: {body}"))
    } else {
        ContextError::ModelUnavailable(format!("HTTP {status}: {body}"))
    }
}

/// Async HTTP client for the OpenRouter chat completions API, bound to
/// one model.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> ContextResult<Self> {
        Self::with_headers(api_key, model, "https://github.com/ctxbench", "ctxbench")
    }

    /// Create a client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        model: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> ContextResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ctxbench/0.1")
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ContextError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> ContextResult<ChatCompletion> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| ContextError::ModelUnavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ContextError::ModelUnavailable(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        parse_completion(&text)
    }
}

impl ModelClient for OpenRouterClient {
    fn invoke(&self, request: ModelRequest) -> ModelFuture<'_> {
        Box::pin(async move {
            let body = ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(request.prompt)],
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            };
            let completion = self.chat(&body).await?;
            if completion.is_truncated() {
                warn!(
                    "{}: response cut off at max_tokens={}",
                    self.model, body.max_tokens
                );
            }
            completion
                .content
                .ok_or_else(|| ContextError::ModelUnavailable("empty LLM response".into()))
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
