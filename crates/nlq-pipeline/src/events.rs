//! Pipeline event streaming
//!
//! Streaming runs publish progress events over a bounded channel while the
//! pipeline executes in a background task. Emission is fire-and-forget: a
//! slow or departed consumer loses events but never stalls the pipeline.
//! Dropping the stream aborts the background task, which cancels any
//! in-flight model call.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::orchestrator::PipelineResponse;

/// Default bound on buffered events per stream.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default per-poll wait in [`PipelineStream::next`].
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(35);

/// Named pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    InputValidation,
    IntentParsing,
    SqlGeneration,
    SqlValidation,
    SqlExecution,
    ResultFormatting,
    ErrorHandling,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::InputValidation => "input_validation",
            PipelineStage::IntentParsing => "intent_parsing",
            PipelineStage::SqlGeneration => "sql_generation",
            PipelineStage::SqlValidation => "sql_validation",
            PipelineStage::SqlExecution => "sql_execution",
            PipelineStage::ResultFormatting => "result_formatting",
            PipelineStage::ErrorHandling => "error_handling",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Progress events published during a streaming run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStart { stage: PipelineStage },
    StageEnd { stage: PipelineStage, duration_ms: u64 },
    /// Raw model output chunk, forwarded as received.
    Token { text: String },
    Completed { success: bool },
    Failed { message: String },
}

/// Fire-and-forget event publisher handed through the pipeline stages.
///
/// Disabled (non-streaming) senders make every emit a no-op, so the
/// orchestrator code paths stay identical between run modes.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) fn disabled() -> Self {
        Self { tx: None }
    }

    /// Non-blocking emit. Events are dropped when the buffer is full or
    /// the consumer is gone.
    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.try_send(event) {
                tracing::debug!(error = %e, "pipeline event dropped");
            }
        }
    }

    /// Channel for raw model chunks, if streaming is active.
    ///
    /// The caller must await the returned forwarder handle after dropping
    /// the sender (and its clones) so every buffered token is published
    /// before later stage events.
    pub(crate) fn token_channel(&self) -> Option<(mpsc::Sender<String>, JoinHandle<()>)> {
        let tx = self.tx.clone()?;
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(EVENT_CHANNEL_CAPACITY);
        let forwarder = tokio::spawn(async move {
            while let Some(text) = chunk_rx.recv().await {
                if tx
                    .try_send(PipelineEvent::Token { text })
                    .is_err()
                {
                    break;
                }
            }
        });
        Some((chunk_tx, forwarder))
    }
}

/// Consumer handle for a streaming pipeline run.
///
/// Dropping the stream aborts the background task.
pub struct PipelineStream {
    receiver: mpsc::Receiver<PipelineEvent>,
    handle: Option<JoinHandle<PipelineResponse>>,
    poll_timeout: Duration,
}

impl PipelineStream {
    pub(crate) fn new(
        receiver: mpsc::Receiver<PipelineEvent>,
        handle: JoinHandle<PipelineResponse>,
    ) -> Self {
        Self {
            receiver,
            handle: Some(handle),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Next event, or `None` when the stream is finished or the per-poll
    /// timeout elapses.
    pub async fn next(&mut self) -> Option<PipelineEvent> {
        tokio::time::timeout(self.poll_timeout, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the background run to finish and return its response.
    ///
    /// Returns `None` if the task was aborted or panicked.
    pub async fn into_response(mut self) -> Option<PipelineResponse> {
        let handle = self.handle.take()?;
        handle.await.ok()
    }
}

impl Drop for PipelineStream {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
