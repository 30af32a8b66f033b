//! Progress events streamed to the issuing client
//!
//! Sends are fire-and-forget: a closed channel is logged at trace level and
//! never fails the operation that produced the event.

use pagepilot_metrics::PhaseMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{CommandError, ErrorKind};

/// Outbound event, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    PhaseStart {
        phase: String,
        message: String,
    },
    Progress {
        message: String,
    },
    PhaseComplete {
        phase: String,
        data: Value,
        metrics: PhaseMetrics,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<String>,
        kind: ErrorKind,
        message: String,
    },
    Info {
        message: String,
    },
    ChatResponse {
        message: String,
    },
}

impl ProgressEvent {
    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
        }
    }

    pub fn error(phase: Option<&str>, error: &CommandError) -> Self {
        Self::Error {
            phase: phase.map(str::to_string),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Terminal events end a command's event stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::PhaseStart { .. } | Self::Progress { .. })
    }
}

/// Destination for progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    fn progress(&self, message: &str) {
        self.emit(ProgressEvent::progress(message));
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        if self.send(event).is_err() {
            trace!("Progress receiver gone, event dropped");
        }
    }
}

/// Keeps every event in memory, for tests and batch callers
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages of `progress` events, in order
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn terminal(&self) -> Vec<ProgressEvent> {
        self.events().into_iter().filter(|e| e.is_terminal()).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
