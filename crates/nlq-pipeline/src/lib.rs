//! Async orchestration of the Korean NL→SQL pipeline
//!
//! Ties the pure core (`nlq-core`) and the LLM boundary (`nlq-agentic`)
//! into one request/response flow: classify, generate (per strategy),
//! validate, execute through a collaborator, format. Adds the operational
//! layer the core crates deliberately leave out: retry with backoff,
//! timeouts, event streaming and metrics emission.
//!
//! The orchestrator never surfaces a raw error. Every failure path lands
//! in a structurally complete [`PipelineResponse`] with `success == false`
//! and a populated `error_message`.

pub mod error;
pub mod events;
pub mod executor;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod strategy;

// Re-exports for convenience
pub use error::PipelineError;
pub use events::{PipelineEvent, PipelineStream};
pub use executor::SqlExecutor;
pub use metrics::{MetricsEmitter, PipelineMetrics};
pub use orchestrator::{NlqPipeline, PipelineRequest, PipelineResponse};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use strategy::GenerationStrategy;
