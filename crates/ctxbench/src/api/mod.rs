//! Model access: the capability trait handed to every component, plus the
//! plumbing around it.
//!
//! - [`model`]: [`ModelClient`], the opaque `invoke(prompt, temperature,
//!   max_tokens) -> text` contract, and [`invoke_with_timeout`].
//! - [`retry`]: [`RetryingModel`], bounded exponential backoff for
//!   transient failures. Strategies never retry on their own; wrap the
//!   client once at the edge if retries are wanted.
//! - [`tracing`]: run and step correlation IDs.

pub mod model;
pub mod retry;
pub mod tracing;

pub use model::{ModelClient, ModelFuture, ModelRequest, invoke_with_timeout};
pub use retry::{RetryConfig, RetryingModel};
pub use tracing::{generate_trace_id, step_span_id};
