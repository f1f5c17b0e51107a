//! Run events - state transitions and log lines
//!
//! Build output and container logs are forwarded line by line, in the order
//! they are produced, to whoever holds the receiving end of the sink.

use crate::state::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Where a log line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSource {
    /// Image build output
    Build,
    /// Container stdout/stderr
    Container,
    /// Pipeline messages
    System,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Build => "build",
            LogSource::Container => "container",
            LogSource::System => "system",
        }
    }
}

/// A single log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub content: String,
}

impl LogEntry {
    pub fn new(source: LogSource, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            content: content.into(),
        }
    }
}

/// Event emitted while a run progresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    State(RunState),
    Log(LogEntry),
}

/// Sending half for run events. A disabled sink drops everything.
///
/// State changes are checked against [`RunState::can_transition_to`];
/// `Absent` opens a new run.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<RunEvent>>,
    last_state: Arc<Mutex<Option<RunState>>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self {
            tx: Some(tx),
            last_state: Arc::default(),
        }
    }

    /// Sink plus the receiver that observes it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            // receiver gone means nobody is watching; the run itself continues
            let _ = tx.send(event);
        }
    }

    pub fn state(&self, state: RunState) {
        debug!(state = %state, "Run state");
        {
            let mut last = self
                .last_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(prev) = last.as_ref() {
                let legal = state == RunState::Absent || prev.can_transition_to(&state);
                if !legal {
                    warn!(from = %prev, to = %state, "Illegal run state transition");
                }
                debug_assert!(legal, "illegal run state transition {} -> {}", prev, state);
            }
            *last = Some(state.clone());
        }
        self.emit(RunEvent::State(state));
    }

    pub fn build_log(&self, line: &str) {
        self.emit(RunEvent::Log(LogEntry::new(LogSource::Build, line)));
    }

    /// Decoded container output, one event per line
    pub fn container_logs(&self, text: &str) {
        for line in text.lines() {
            self.emit(RunEvent::Log(LogEntry::new(LogSource::Container, line)));
        }
    }

    pub fn system(&self, message: impl Into<String>) {
        self.emit(RunEvent::Log(LogEntry::new(LogSource::System, message)));
    }
}
