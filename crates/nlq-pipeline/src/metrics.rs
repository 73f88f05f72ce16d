//! Per-request pipeline metrics
//!
//! Metrics are emitted fire-and-forget over a bounded channel: the
//! pipeline calls `try_send` and moves on, counting drops instead of
//! waiting. A sink task drains the receiver wherever the embedding
//! application wants the data to go.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use nlq_core::GenerationMethod;

use crate::strategy::GenerationStrategy;

/// Default bound on buffered metrics.
const METRICS_CHANNEL_CAPACITY: usize = 1024;

/// One record per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub request_id: uuid::Uuid,
    pub strategy_used: GenerationStrategy,
    pub duration_ms: u64,
    pub success: bool,
    pub generation_method: GenerationMethod,
    pub retry_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Fire-and-forget metrics publisher.
#[derive(Clone)]
pub struct MetricsEmitter {
    tx: mpsc::Sender<PipelineMetrics>,
    emitted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl MetricsEmitter {
    /// Emitter plus the receiver a sink task should drain.
    pub fn channel() -> (Self, mpsc::Receiver<PipelineMetrics>) {
        Self::with_capacity(METRICS_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<PipelineMetrics>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                emitted: Arc::new(AtomicU64::new(0)),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Non-blocking emit. Records are dropped when the buffer is full or
    /// the sink is gone.
    pub fn emit(&self, metrics: PipelineMetrics) {
        match self.tx.try_send(metrics) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %e, "pipeline metrics record dropped");
            }
        }
    }

    /// (emitted, dropped) counts since construction.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.emitted.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        )
    }
}
