//! Error types for the container pipeline

use crate::engine::ContainerStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`ContainerEngine`](crate::engine::ContainerEngine)
#[derive(Debug, Error)]
pub enum EngineError {
    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    Api(#[from] bollard::errors::Error),

    /// The engine build stream reported an error
    #[error("Image build failed: {0}")]
    BuildFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Container engine unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Container engine error: {0}")]
    Other(String),
}

/// Reconciliation step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    Lookup,
    Stop,
    Remove,
    Run,
}

impl ReconcileStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStage::Lookup => "lookup",
            ReconcileStage::Stop => "stop",
            ReconcileStage::Remove => "remove",
            ReconcileStage::Run => "run",
        }
    }
}

impl std::fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline error taxonomy. Nothing here is retried.
#[derive(Debug, Error)]
pub enum RunError {
    /// Invalid parameters for build-spec rendering
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Build error: {0}")]
    Build(#[source] EngineError),

    /// Partial state (e.g. removed but not relaunched) is left as is
    #[error("Reconcile error during {stage}: {source}")]
    Reconcile {
        stage: ReconcileStage,
        #[source]
        source: EngineError,
    },

    /// Container never reached running (or exited with a failure)
    #[error("Container {container_id} failed to start (last status: {status})")]
    Startup {
        container_id: String,
        status: ContainerStatus,
        logs: String,
    },

    /// Engine failure outside build/reconcile (inspect, start, logs)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Foundation(#[from] mdrun_foundation::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Short name of the failing phase, used in run events
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Generation(_) => "generation",
            RunError::Build(_) => "build",
            RunError::Reconcile { .. } => "reconcile",
            RunError::Startup { .. } => "startup",
            RunError::Engine(_) => "engine",
            RunError::Foundation(_) => "input",
            RunError::Io(_) => "io",
        }
    }

    /// Container logs captured with a startup failure
    pub fn startup_logs(&self) -> Option<&str> {
        match self {
            RunError::Startup { logs, .. } => Some(logs.as_str()),
            _ => None,
        }
    }
}
