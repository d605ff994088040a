//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use ctxbench::api::{ModelClient, ModelFuture, ModelRequest};
use ctxbench::bench::Scenario;
use ctxbench::context::{KeywordScorer, TiktokenTokenizer};
use ctxbench::error::ContextError;
use ctxbench::history::HistoryStep;
use ctxbench::strategy::StrategyDeps;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum Reply {
    Text(String),
    Fail,
}

/// Replies by matching prompt substrings (case-insensitive, first rule
/// wins) and records every prompt. Optionally sleeps before replying.
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

    /// Recorded prompts containing `needle`.
    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains(needle))
            .collect()
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

pub fn deps(model: Arc<ScriptedModel>) -> StrategyDeps {
    StrategyDeps {
        model,
        scorer: Arc::new(KeywordScorer::default()),
        tokenizer: Arc::new(TiktokenTokenizer::cl100k().unwrap()),
        model_timeout: Duration::from_secs(5),
    }
}

/// The two-step witness and footage scenario.
pub fn seed_steps() -> Vec<HistoryStep> {
    vec![
        HistoryStep::new(
            1,
            "Interview witness",
            "Witness saw suspect wearing red jacket",
            "9:30",
        ),
        HistoryStep::new(
            2,
            "Review security footage",
            "Footage shows suspect with long dark hair",
            "10:00",
        ),
    ]
}

/// `n` steps whose observations carry a unique `CLUE-<i>` marker.
pub fn marked_scenario(n: u32) -> Scenario {
    let steps: Vec<HistoryStep> = (1..=n)
        .map(|i| {
            HistoryStep::new(
                i,
                format!("Action {i}"),
                format!("Observation CLUE-{i} about the case."),
                format!("Monday {i}:00"),
            )
        })
        .collect();
    Scenario {
        scenario_type: "marked".into(),
        description: String::new(),
        num_steps: Some(n as usize),
        questions: (1..=n).map(|i| format!("What was found at stage {i}?")).collect(),
        ground_truth: (1..=n).map(|i| format!("CLUE-{i}")).collect(),
        steps,
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}
