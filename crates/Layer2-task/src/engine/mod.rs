//! Container engine boundary
//!
//! The pipeline only talks to the engine through [`ContainerEngine`], so the
//! client is constructed once at startup and handed to each component.
//!
//! - [`docker`]: bollard-backed Docker/Podman client
//! - [`memory`]: in-process engine used by tests (`test-util` feature)

pub mod docker;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use docker::DockerEngine;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{EngineCall, LaunchBehavior, MemoryEngine};

use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Built image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Engine-assigned image id
    pub id: String,
    /// Tag the image was built under
    pub tag: String,
}

/// Container status as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    /// Stopped, with the process exit code
    Exited(i64),
    Dead,
    Unknown(String),
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }

    /// The main process finished with exit code 0
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, ContainerStatus::Exited(0))
    }

    /// No start command will bring this container to running on its own
    pub fn is_failed(&self) -> bool {
        matches!(self, ContainerStatus::Dead)
            || matches!(self, ContainerStatus::Exited(code) if *code != 0)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Exited(_) => "exited",
            ContainerStatus::Dead => "dead",
            ContainerStatus::Unknown(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerStatus::Exited(code) => write!(f, "exited ({})", code),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Container as found by name lookup or returned by a launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
}

/// Operations the pipeline needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine is reachable
    async fn ping(&self) -> Result<(), EngineError>;

    /// Build `dockerfile` inside `context_dir` under `tag`.
    ///
    /// Every build log line is passed to `on_log` in the order the engine
    /// emits it.
    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: &str,
        tag: &str,
        on_log: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ImageInfo, EngineError>;

    /// Look up a container by name, `None` when no such container exists
    async fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError>;

    /// Stop with the engine's default grace period
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;

    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;

    /// Create and start a detached container from `image_id` bound to `name`
    async fn run_container(&self, image_id: &str, name: &str)
        -> Result<ContainerInfo, EngineError>;

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Raw stdout + stderr of the container
    async fn container_logs(&self, id: &str) -> Result<Vec<u8>, EngineError>;

    /// Engine name for logging
    fn name(&self) -> &'static str;
}

/// Bound an engine call; the elapsed deadline becomes [`EngineError::Timeout`].
pub async fn with_deadline<T, F>(
    operation: &str,
    after: Duration,
    fut: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation: operation.to_string(),
            after,
        }),
    }
}
