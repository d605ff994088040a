//! Strategy behavior over a growing history, driven through the
//! public API with a scripted model.

mod common;

use common::{ScriptedModel, seed_steps};
use ctxbench::config::{CompressConfig, SelectConfig, WriteConfig};
use ctxbench::context::KeywordScorer;
use ctxbench::context::TiktokenTokenizer;
use ctxbench::history::{HistoryStep, render_history};
use ctxbench::strategy::{CompressStrategy, ContextStrategy, SelectStrategy, WriteStrategy};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn write_strategy(model: Arc<ScriptedModel>) -> WriteStrategy {
    WriteStrategy::new(
        WriteConfig::default(),
        model,
        Arc::new(KeywordScorer::default()),
        TIMEOUT,
    )
}

fn compress_strategy(model: Arc<ScriptedModel>, max_tokens: usize) -> CompressStrategy {
    CompressStrategy::new(
        CompressConfig {
            max_tokens,
            ..Default::default()
        },
        model,
        Arc::new(TiktokenTokenizer::cl100k().unwrap()),
        TIMEOUT,
    )
}

// ── Select ───────────────────────────────────────────────────────────

#[tokio::test]
async fn select_keeps_both_seed_blocks_with_k_two() {
    let history = seed_steps();
    let mut select = SelectStrategy::new(SelectConfig { top_k: 2 }, Arc::new(KeywordScorer::default()));

    let context = select
        .process(&history, "What does the suspect look like?")
        .await
        .unwrap();
    assert!(context.contains("red jacket"));
    assert!(context.contains("long dark hair"));
}

#[tokio::test]
async fn select_is_deterministic_for_same_input() {
    let history = seed_steps();
    let mut select = SelectStrategy::new(SelectConfig { top_k: 1 }, Arc::new(KeywordScorer::default()));

    let first = select.process(&history, "red jacket").await.unwrap();
    let second = select.process(&history, "red jacket").await.unwrap();
    assert_eq!(first, second);
    assert!(first.contains("Step 1"));
    assert!(!first.contains("Step 2"));
}

// ── Write ────────────────────────────────────────────────────────────

#[tokio::test]
async fn write_extracts_each_seed_step_once() {
    let model = Arc::new(
        ScriptedModel::new()
            .on("red jacket", "- Suspect wore a red jacket\n- Seen by a witness")
            .on("long dark hair", "- Suspect has long dark hair"),
    );
    let mut write = write_strategy(model.clone());
    let history = seed_steps();

    write.process(&history[..1], "What was the suspect wearing?").await.unwrap();
    assert_eq!(model.calls(), 1);

    let context = write
        .process(&history, "What was the suspect wearing?")
        .await
        .unwrap();
    assert_eq!(model.calls(), 2);
    assert_eq!(write.processed_steps().len(), 2);
    assert!(write.scratchpad().iter().any(|f| f.text.contains("red jacket")));
    assert!(context.starts_with("Key Facts:"));
    assert!(context.contains("red jacket"));

    // Same history again: nothing new to extract.
    write.process(&history, "hair").await.unwrap();
    assert_eq!(model.calls(), 2);
    assert_eq!(write.scratchpad().len(), 3);
}

#[tokio::test]
async fn write_scratchpad_keeps_facts_in_step_order() {
    let model = Arc::new(ScriptedModel::new().with_default("- a detail"));
    let mut write = write_strategy(model);
    let history: Vec<HistoryStep> = (1..=4)
        .map(|i| HistoryStep::new(i, format!("Action {i}"), "Something seen.", "noon"))
        .collect();

    for k in 1..=history.len() {
        write.process(&history[..k], "detail").await.unwrap();
    }
    let sources: Vec<u32> = write.scratchpad().iter().map(|f| f.source_step).collect();
    assert_eq!(sources, vec![1, 2, 3, 4]);
}

// ── Compress ─────────────────────────────────────────────────────────

#[tokio::test]
async fn compress_passes_raw_history_below_threshold() {
    let model = Arc::new(ScriptedModel::new());
    let mut compress = compress_strategy(model.clone(), 10_000);
    let history = seed_steps();

    let context = compress.process(&history, "anything").await.unwrap();
    assert_eq!(context, render_history(&history));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn compress_resummarizes_only_when_history_grows() {
    let model = Arc::new(ScriptedModel::new().with_default("Suspect: red jacket, long dark hair."));
    let mut compress = compress_strategy(model.clone(), 5);
    let mut history = seed_steps();

    let first = compress.process(&history, "q").await.unwrap();
    assert_eq!(first, "Suspect: red jacket, long dark hair.");
    assert_eq!(compress.summarization_calls(), 1);

    compress.process(&history, "another question").await.unwrap();
    assert_eq!(compress.summarization_calls(), 1);

    history.push(HistoryStep::new(3, "Check records", "Former employee.", "11:00"));
    compress.process(&history, "q").await.unwrap();
    assert_eq!(compress.summarization_calls(), 2);
    assert_eq!(compress.last_summarized_step(), 3);
    assert_eq!(model.calls(), 2);
}
