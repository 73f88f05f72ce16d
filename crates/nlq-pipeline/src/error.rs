//! Pipeline error types

use thiserror::Error;

/// Errors produced while driving a request through the pipeline.
///
/// These never escape [`crate::NlqPipeline::run`]; the orchestrator folds
/// them into the response's `error_message`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The generate-and-validate unit exceeded the request deadline.
    #[error("pipeline timed out after {0} ms")]
    Timeout(u64),

    /// SQL generation failed after retries were exhausted.
    #[error("SQL generation failed: {0}")]
    Generation(String),

    /// The execution collaborator returned an error.
    #[error("SQL execution failed: {0}")]
    Execution(String),

    /// No generator is configured for the requested strategy.
    #[error("strategy {0} requires an LLM generator but none is configured")]
    MissingGenerator(String),
}
