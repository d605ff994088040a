//! Correlation IDs for benchmark runs.
//!
//! Assigns a unique `run_id` to each benchmark run and a span ID to each
//! step within it, so log lines and result files can be joined.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Generate a unique trace ID for a benchmark run.
pub fn generate_trace_id() -> String {
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // Use a counter to handle sub-nanosecond calls.
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("run-{ts:x}-{count:04x}")
}

/// Span ID for one step of a run.
pub fn step_span_id(run_id: &str, step: u32) -> String {
    format!("{run_id}:s{step}")
}
