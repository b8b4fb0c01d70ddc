//! Live progress stream for a batch.
//!
//! A batch emits `init`, one `progress` per page, then exactly one of
//! `complete` or `error`. Any transport (stdout lines, SSE, WebSocket) can
//! sit behind a [`ProgressSink`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{BatchReport, ModelKind};

/// Events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Init {
        total: usize,
        model: ModelKind,
    },
    Progress {
        current: usize,
        total: usize,
        path: String,
    },
    Complete(BatchReport),
    Error {
        error: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Complete(_) | ProgressEvent::Error { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Init { .. } => "init",
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Complete(_) => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }
}

/// Receives progress events. Dropping the sink closes the stream.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Init { total, model } => {
                tracing::info!(%total, %model, "Batch started");
            }
            ProgressEvent::Progress {
                current,
                total,
                path,
            } => {
                tracing::info!(%current, %total, %path, "Processing page");
            }
            ProgressEvent::Complete(report) => {
                tracing::info!(
                    total = report.total,
                    success = report.success_count,
                    errors = report.error_count,
                    model = %report.model,
                    "Batch complete"
                );
            }
            ProgressEvent::Error { error } => {
                tracing::error!(%error, "Batch aborted");
            }
        }
    }
}

/// Sink that forwards events into a channel for a live consumer.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress consumer went away, dropping event");
        }
    }
}

/// Fan out to two sinks.
impl<A: ProgressSink, B: ProgressSink> ProgressSink for (A, B) {
    fn emit(&self, event: ProgressEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}
