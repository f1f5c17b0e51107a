//! Container health check
//!
//! Inspects a freshly launched container. A container that already failed is
//! reported as is; one that is neither running nor finished is started once
//! and then polled until it runs, finishes cleanly, fails, or the startup
//! deadline passes. The container output is surfaced on every outcome and
//! failures carry it.

use crate::engine::{with_deadline, ContainerEngine, ContainerStatus};
use crate::error::RunError;
use crate::log::EventSink;
use crate::reconcile::ContainerHandle;
use crate::state::RunState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Result of a successful health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    /// Container is running
    Running { id: String },
    /// Script already finished with exit code 0
    Completed { id: String, logs: String },
}

impl Health {
    pub fn id(&self) -> &str {
        match self {
            Health::Running { id } | Health::Completed { id, .. } => id,
        }
    }

    pub fn state(&self) -> RunState {
        match self {
            Health::Running { .. } => RunState::Running,
            Health::Completed { .. } => RunState::Completed,
        }
    }
}

pub struct ContainerHealthCheck {
    engine: Arc<dyn ContainerEngine>,
    startup_timeout: Duration,
    poll_interval: Duration,
    call_timeout: Duration,
}

impl ContainerHealthCheck {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        startup_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            startup_timeout,
            poll_interval,
            call_timeout: startup_timeout.max(Duration::from_secs(1)),
        }
    }

    /// Per-call deadline for inspect/start/logs
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn check(
        &self,
        handle: &ContainerHandle,
        events: &EventSink,
    ) -> Result<Health, RunError> {
        let status = self.status(&handle.id).await?;
        if status.is_running() {
            info!(id = %handle.id, "Container running");
            events.system(format!("Container running {}", handle.id));
            return self.running(handle, events).await;
        }
        if status.is_clean_exit() {
            return self.completed(handle, events).await;
        }
        // failed containers are not restarted
        if status.is_failed() {
            return Err(self.startup_failure(handle, status, events).await);
        }

        info!(id = %handle.id, status = %status, "Container not running, starting");
        events.system(format!(
            "Container {} is not running, trying to start",
            handle.id
        ));
        events.state(RunState::Starting);
        with_deadline(
            "container start",
            self.call_timeout,
            self.engine.start_container(&handle.id),
        )
        .await?;

        let deadline = Instant::now() + self.startup_timeout;
        loop {
            let status = self.status(&handle.id).await?;

            if status.is_running() {
                events.system(format!("Container started {}", handle.id));
                return self.running(handle, events).await;
            }
            if status.is_clean_exit() {
                return self.completed(handle, events).await;
            }
            if status.is_failed() || Instant::now() >= deadline {
                return Err(self.startup_failure(handle, status, events).await);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn status(&self, id: &str) -> Result<ContainerStatus, RunError> {
        Ok(with_deadline(
            "container inspect",
            self.call_timeout,
            self.engine.container_status(id),
        )
        .await?)
    }

    async fn logs(&self, id: &str) -> Result<String, RunError> {
        let bytes = with_deadline(
            "container logs",
            self.call_timeout,
            self.engine.container_logs(id),
        )
        .await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Output produced so far by a running container
    async fn running(
        &self,
        handle: &ContainerHandle,
        events: &EventSink,
    ) -> Result<Health, RunError> {
        let logs = self.logs(&handle.id).await?;
        if !logs.is_empty() {
            events.system("Container logs");
            events.container_logs(&logs);
        }
        Ok(Health::Running {
            id: handle.id.clone(),
        })
    }

    async fn completed(
        &self,
        handle: &ContainerHandle,
        events: &EventSink,
    ) -> Result<Health, RunError> {
        let logs = self.logs(&handle.id).await?;
        info!(id = %handle.id, "Container finished");
        events.system("Container logs");
        events.container_logs(&logs);
        Ok(Health::Completed {
            id: handle.id.clone(),
            logs,
        })
    }

    async fn startup_failure(
        &self,
        handle: &ContainerHandle,
        status: ContainerStatus,
        events: &EventSink,
    ) -> RunError {
        warn!(id = %handle.id, status = %status, "Container failed to start");
        // the startup error is what matters; missing logs are not worth masking it
        let logs = self.logs(&handle.id).await.unwrap_or_default();
        events.system("Container logs");
        events.container_logs(&logs);
        RunError::Startup {
            container_id: handle.id.clone(),
            status,
            logs,
        }
    }
}
