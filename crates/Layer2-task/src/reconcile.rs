//! Container reconciler
//!
//! Keeps at most one container under the logical name: an existing one is
//! stopped (if running) and removed before a fresh one is launched. A failure
//! after the removal leaves no container under the name; the whole run has
//! to be retried.

use crate::engine::{with_deadline, ContainerEngine, ImageInfo};
use crate::error::{EngineError, ReconcileStage, RunError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Launched container bound to the logical name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub name: String,
    pub id: String,
}

pub struct ContainerReconciler {
    engine: Arc<dyn ContainerEngine>,
    container_name: String,
    timeout: Duration,
}

impl ContainerReconciler {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        container_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            container_name: container_name.into(),
            timeout,
        }
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Replace whatever holds the logical name with a container from `image`
    pub async fn reconcile(&self, image: &ImageInfo) -> Result<ContainerHandle, RunError> {
        let name = self.container_name.as_str();

        let existing = self
            .step(ReconcileStage::Lookup, self.engine.find_container(name))
            .await?;

        match existing {
            None => debug!(container = %name, "No existing container"),
            Some(old) => {
                if old.status.is_running() {
                    info!(container = %name, id = %old.id, "Stopping running container");
                    self.step(ReconcileStage::Stop, self.engine.stop_container(&old.id))
                        .await?;
                }
                info!(container = %name, id = %old.id, status = %old.status, "Removing container");
                self.step(ReconcileStage::Remove, self.engine.remove_container(&old.id))
                    .await?;
            }
        }

        let launched = self
            .step(ReconcileStage::Run, self.engine.run_container(&image.id, name))
            .await?;

        info!(container = %name, id = %launched.id, image = %image.id, "Launched container");
        Ok(ContainerHandle {
            name: name.to_string(),
            id: launched.id,
        })
    }

    async fn step<T, F>(&self, stage: ReconcileStage, fut: F) -> Result<T, RunError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        with_deadline(stage.as_str(), self.timeout, fut)
            .await
            .map_err(|source| RunError::Reconcile { stage, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ContainerStatus, EngineCall, MemoryEngine};

    const NAME: &str = "python-script-container";

    fn image() -> ImageInfo {
        ImageInfo {
            id: "sha256:abc".to_string(),
            tag: "python-script".to_string(),
        }
    }

    fn reconciler(engine: Arc<MemoryEngine>) -> ContainerReconciler {
        ContainerReconciler::new(engine, NAME, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fresh_launch() {
        let engine = Arc::new(MemoryEngine::new());
        let handle = reconciler(engine.clone()).reconcile(&image()).await.unwrap();

        assert_eq!(handle.name, NAME);
        assert_eq!(engine.containers_named(NAME).len(), 1);
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Find { name: NAME.into() },
                EngineCall::Run {
                    image: "sha256:abc".into(),
                    name: NAME.into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_running_container_stopped_then_removed() {
        let engine = Arc::new(MemoryEngine::new());
        let old_id = engine.insert_container(NAME, ContainerStatus::Running);

        let handle = reconciler(engine.clone()).reconcile(&image()).await.unwrap();

        assert_ne!(handle.id, old_id);
        let calls = engine.calls();
        let stop = calls.iter().position(|c| *c == EngineCall::Stop { id: old_id.clone() });
        let remove = calls.iter().position(|c| *c == EngineCall::Remove { id: old_id.clone() });
        let run = calls.iter().position(|c| matches!(c, EngineCall::Run { .. }));
        assert!(stop.is_some(), "running container was not stopped: {calls:?}");
        assert!(stop < remove && remove < run, "calls out of order: {calls:?}");
    }

    #[tokio::test]
    async fn test_stopped_container_removed_without_stop() {
        let engine = Arc::new(MemoryEngine::new());
        let old_id = engine.insert_container(NAME, ContainerStatus::Exited(0));

        reconciler(engine.clone()).reconcile(&image()).await.unwrap();

        let calls = engine.calls();
        assert!(!calls.iter().any(|c| matches!(c, EngineCall::Stop { .. })));
        assert!(calls.contains(&EngineCall::Remove { id: old_id }));
    }

    #[tokio::test]
    async fn test_twice_leaves_exactly_one() {
        let engine = Arc::new(MemoryEngine::new());
        let reconciler = reconciler(engine.clone());

        let first = reconciler.reconcile(&image()).await.unwrap();
        let second = reconciler.reconcile(&image()).await.unwrap();

        let containers = engine.containers_named(NAME);
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].id, second.id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_run_failure_leaves_no_container() {
        let engine = Arc::new(MemoryEngine::new().failing("run"));
        engine.insert_container(NAME, ContainerStatus::Exited(0));

        let err = reconciler(engine.clone()).reconcile(&image()).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Reconcile {
                stage: ReconcileStage::Run,
                ..
            }
        ));
        assert!(engine.containers_named(NAME).is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure() {
        let engine = Arc::new(MemoryEngine::new().failing("find"));
        let err = reconciler(engine).reconcile(&image()).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Reconcile {
                stage: ReconcileStage::Lookup,
                ..
            }
        ));
    }
}
