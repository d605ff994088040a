//! The model capability.
//!
//! Every LLM call in the crate (answering, summarizing, fact extraction,
//! judging) goes through a [`ModelClient`] injected by the caller. Nothing
//! resolves credentials or endpoints from global state; the binary builds
//! an [`OpenRouterClient`](crate::OpenRouterClient) and passes it down as
//! `Arc<dyn ModelClient>`.

use crate::error::{ContextError, ContextResult};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Boxed future returned by [`ModelClient::invoke`].
pub type ModelFuture<'a> = Pin<Box<dyn Future<Output = ContextResult<String>> + Send + 'a>>;

/// A single-prompt completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelRequest {
    /// Deterministic request (temperature 0) with the given output cap.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// An opaque remote completion function.
///
/// Implementations fail with [`ContextError::ModelUnavailable`] or
/// [`ContextError::RateLimited`]. A call is made at most once per
/// `invoke`; retry policy belongs to wrappers such as
/// [`RetryingModel`](super::retry::RetryingModel).
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl ModelClient for Echo {
///     fn invoke(&self, request: ModelRequest) -> ModelFuture<'_> {
///         Box::pin(async move { Ok(request.prompt) })
///     }
/// }
/// ```
pub trait ModelClient: Send + Sync {
    fn invoke(&self, request: ModelRequest) -> ModelFuture<'_>;

    /// Label used in logs and result files.
    fn name(&self) -> &str {
        "model"
    }
}

/// Invoke `model` and give up after `timeout`.
///
/// Dropping the in-flight future cancels the remote call. A zero timeout
/// disables the limit.
pub async fn invoke_with_timeout(
    model: &dyn ModelClient,
    request: ModelRequest,
    timeout: Duration,
) -> ContextResult<String> {
    let prompt_len = request.prompt.len();
    let start = Instant::now();

    let result = if timeout.is_zero() {
        model.invoke(request).await
    } else {
        match tokio::time::timeout(timeout, model.invoke(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{}: call timed out after {:?}", model.name(), timeout);
                Err(ContextError::Timeout(timeout))
            }
        }
    };

    debug!(
        "{}: {} prompt chars, {:.2}s, ok={}",
        model.name(),
        prompt_len,
        start.elapsed().as_secs_f64(),
        result.is_ok()
    );
    result
}
