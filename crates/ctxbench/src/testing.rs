//! Scripted model for unit tests.

use crate::api::model::{ModelClient, ModelFuture, ModelRequest};
use crate::error::ContextError;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub enum Reply {
    Text(String),
    Fail,
}

/// Replies by matching substrings of the prompt (case-insensitive, first
/// rule wins) and records every prompt it receives. Optionally sleeps
/// before replying.
pub struct ScriptedModel {
    rules: Vec<(String, Reply)>,
    default: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: "I don't know".to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, pattern: &str, reply: &str) -> Self {
        self.rules
            .push((pattern.to_lowercase(), Reply::Text(reply.to_string())));
        self
    }

    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_lowercase(), Reply::Fail));
        self
    }

    pub fn with_default(mut self, reply: &str) -> Self {
        self.default = reply.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ModelClient for ScriptedModel {
    fn invoke(&self, request: ModelRequest) -> ModelFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = request.prompt.to_lowercase();
        self.prompts.lock().unwrap().push(request.prompt);

        let reply = self
            .rules
            .iter()
            .find(|(pattern, _)| lower.contains(pattern.as_str()))
            .map(|(_, reply)| match reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail => Err(ContextError::ModelUnavailable("scripted failure".into())),
            })
            .unwrap_or_else(|| Ok(self.default.clone()));
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
