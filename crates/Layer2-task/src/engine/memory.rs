//! In-memory container engine
//!
//! Keeps images and containers in a map and records every call, so the
//! reconciliation and health-check rules can be checked without a daemon.

use super::{ContainerEngine, ContainerInfo, ContainerStatus, ImageInfo};
use crate::error::EngineError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// What a launched or started container does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchBehavior {
    /// Keeps running
    Running,
    /// Main process exits immediately with the given code
    Exits(i64),
    /// Never leaves the created state
    StaysCreated,
}

impl LaunchBehavior {
    fn status(self) -> ContainerStatus {
        match self {
            LaunchBehavior::Running => ContainerStatus::Running,
            LaunchBehavior::Exits(code) => ContainerStatus::Exited(code),
            LaunchBehavior::StaysCreated => ContainerStatus::Created,
        }
    }
}

/// Recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Build { tag: String },
    Find { name: String },
    Stop { id: String },
    Remove { id: String },
    Run { image: String, name: String },
    Status { id: String },
    Start { id: String },
    Logs { id: String },
}

#[derive(Debug, Clone)]
struct MemoryContainer {
    id: String,
    name: String,
    status: ContainerStatus,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    images: HashMap<String, String>,
    containers: Vec<MemoryContainer>,
    calls: Vec<EngineCall>,
    build_logs: Vec<String>,
    build_error: Option<String>,
    failing: Option<&'static str>,
    launch: Option<LaunchBehavior>,
    start: Option<LaunchBehavior>,
    output: Vec<u8>,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn check(&self, op: &'static str) -> Result<(), EngineError> {
        if self.failing == Some(op) {
            return Err(EngineError::Other(format!("injected {} failure", op)));
        }
        Ok(())
    }

    fn container_mut(&mut self, id: &str) -> Result<&mut MemoryContainer, EngineError> {
        self.containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("container {}", id)))
    }
}

/// In-process [`ContainerEngine`]
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<MemoryState>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines replayed as build output
    pub fn with_build_logs<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().build_logs = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Make every build fail with `message`
    pub fn with_build_error(self, message: impl Into<String>) -> Self {
        self.lock().build_error = Some(message.into());
        self
    }

    /// Make one operation (`find`, `stop`, `remove`, `run`, `status`, `start`, `logs`) fail
    pub fn failing(self, op: &'static str) -> Self {
        self.lock().failing = Some(op);
        self
    }

    /// Status of newly launched containers (default: running)
    pub fn with_launch(self, behavior: LaunchBehavior) -> Self {
        self.lock().launch = Some(behavior);
        self
    }

    /// Status after an explicit start (default: same as launch)
    pub fn with_start(self, behavior: LaunchBehavior) -> Self {
        self.lock().start = Some(behavior);
        self
    }

    /// Bytes returned by `container_logs`
    pub fn with_output(self, output: impl Into<Vec<u8>>) -> Self {
        self.lock().output = output.into();
        self
    }

    /// Seed a container that existed before the run
    pub fn insert_container(&self, name: &str, status: ContainerStatus) -> String {
        let mut state = self.lock();
        let id = state.next_id("existing");
        state.containers.push(MemoryContainer {
            id: id.clone(),
            name: name.to_string(),
            status,
        });
        id
    }

    /// Containers currently bound to `name`
    pub fn containers_named(&self, name: &str) -> Vec<ContainerInfo> {
        self.lock()
            .containers
            .iter()
            .filter(|c| c.name == name)
            .map(|c| ContainerInfo {
                id: c.id.clone(),
                name: c.name.clone(),
                status: c.status.clone(),
            })
            .collect()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn image_id(&self, tag: &str) -> Option<String> {
        self.lock().images.get(tag).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // a panic in another test thread must not hide this test's result
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContainerEngine for MemoryEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: &str,
        tag: &str,
        on_log: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ImageInfo, EngineError> {
        let (logs, error) = {
            let mut state = self.lock();
            state.calls.push(EngineCall::Build {
                tag: tag.to_string(),
            });
            (state.build_logs.clone(), state.build_error.clone())
        };

        if !context_dir.join(dockerfile).exists() {
            return Err(EngineError::BuildFailed(format!(
                "{} not found in {}",
                dockerfile,
                context_dir.display()
            )));
        }

        for line in &logs {
            on_log(line);
        }
        if let Some(error) = error {
            return Err(EngineError::BuildFailed(error));
        }

        let mut state = self.lock();
        let id = state.next_id("sha256:image");
        state.images.insert(tag.to_string(), id.clone());
        Ok(ImageInfo {
            id,
            tag: tag.to_string(),
        })
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Find {
            name: name.to_string(),
        });
        state.check("find")?;
        Ok(state
            .containers
            .iter()
            .find(|c| c.name == name)
            .map(|c| ContainerInfo {
                id: c.id.clone(),
                name: c.name.clone(),
                status: c.status.clone(),
            }))
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Stop { id: id.to_string() });
        state.check("stop")?;
        state.container_mut(id)?.status = ContainerStatus::Exited(0);
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Remove { id: id.to_string() });
        state.check("remove")?;
        let container = state.container_mut(id)?;
        if container.status.is_running() {
            return Err(EngineError::Other(format!(
                "cannot remove running container {}",
                id
            )));
        }
        state.containers.retain(|c| c.id != id);
        Ok(())
    }

    async fn run_container(
        &self,
        image_id: &str,
        name: &str,
    ) -> Result<ContainerInfo, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Run {
            image: image_id.to_string(),
            name: name.to_string(),
        });
        state.check("run")?;

        if state.containers.iter().any(|c| c.name == name) {
            return Err(EngineError::Other(format!(
                "Conflict. The container name \"{}\" is already in use",
                name
            )));
        }

        let id = state.next_id("container");
        let status = state.launch.unwrap_or(LaunchBehavior::Running).status();
        let container = MemoryContainer {
            id: id.clone(),
            name: name.to_string(),
            status: status.clone(),
        };
        state.containers.push(container);
        Ok(ContainerInfo {
            id,
            name: name.to_string(),
            status,
        })
    }

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Status { id: id.to_string() });
        state.check("status")?;
        Ok(state.container_mut(id)?.status.clone())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Start { id: id.to_string() });
        state.check("start")?;
        let behavior = state
            .start
            .or(state.launch)
            .unwrap_or(LaunchBehavior::Running);
        state.container_mut(id)?.status = behavior.status();
        Ok(())
    }

    async fn container_logs(&self, id: &str) -> Result<Vec<u8>, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Logs { id: id.to_string() });
        state.check("logs")?;
        state.container_mut(id)?;
        Ok(state.output.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_rejects_duplicate_name() {
        let engine = MemoryEngine::new();
        engine.run_container("img", "box").await.unwrap();

        let result = engine.run_container("img", "box").await;
        assert!(result.is_err());
        assert_eq!(engine.containers_named("box").len(), 1);
    }

    #[tokio::test]
    async fn test_remove_running_container_fails() {
        let engine = MemoryEngine::new();
        let id = engine.insert_container("box", ContainerStatus::Running);

        assert!(engine.remove_container(&id).await.is_err());
        engine.stop_container(&id).await.unwrap();
        engine.remove_container(&id).await.unwrap();
        assert!(engine.containers_named("box").is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let engine = MemoryEngine::new().failing("find");
        assert!(engine.find_container("box").await.is_err());
        assert_eq!(
            engine.calls(),
            vec![EngineCall::Find {
                name: "box".to_string()
            }]
        );
    }
}
