//! Container pipeline
//!
//! generate spec → build image → reconcile container → health check,
//! reporting each state transition to the event sink.

use crate::buildspec::BuildSpecGenerator;
use crate::engine::{ContainerEngine, ImageInfo};
use crate::error::RunError;
use crate::health::{ContainerHealthCheck, Health};
use crate::image::ImageBuilder;
use crate::log::EventSink;
use crate::payload::AggregatedPayload;
use crate::reconcile::{ContainerHandle, ContainerReconciler};
use crate::state::RunState;
use mdrun_foundation::RunnerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// What a finished container run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerReport {
    pub dockerfile: PathBuf,
    pub image: ImageInfo,
    pub container: ContainerHandle,
    pub health: Health,
}

impl ContainerReport {
    pub fn state(&self) -> RunState {
        self.health.state()
    }
}

pub struct ContainerPipeline {
    generator: BuildSpecGenerator,
    builder: ImageBuilder,
    reconciler: ContainerReconciler,
    health: ContainerHealthCheck,
}

impl ContainerPipeline {
    /// Wire every stage to the same engine client
    pub fn new(engine: Arc<dyn ContainerEngine>, config: &RunnerConfig) -> Self {
        let container = &config.container;
        let timeouts = &config.timeouts;

        Self {
            generator: BuildSpecGenerator::new(&container.build_dir, container.embed),
            builder: ImageBuilder::new(engine.clone(), &container.image_tag, timeouts.build()),
            reconciler: ContainerReconciler::new(
                engine.clone(),
                &container.container_name,
                timeouts.engine(),
            ),
            health: ContainerHealthCheck::new(
                engine,
                timeouts.startup(),
                timeouts.poll_interval(),
            )
            .with_call_timeout(timeouts.engine()),
        }
    }

    pub async fn run(
        &self,
        runtime_version: &str,
        payload: &AggregatedPayload,
        events: &EventSink,
    ) -> Result<ContainerReport, RunError> {
        let span = info_span!(
            "container_run",
            container = %self.reconciler.container_name(),
            tag = %self.builder.tag()
        );

        let result = self
            .run_stages(runtime_version, payload, events)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            events.state(RunState::Failed(format!("{} failed: {}", e.kind(), e)));
        }
        result
    }

    async fn run_stages(
        &self,
        runtime_version: &str,
        payload: &AggregatedPayload,
        events: &EventSink,
    ) -> Result<ContainerReport, RunError> {
        events.state(RunState::Absent);
        events.system(format!(
            "One moment please, preparing a container for your code in python {}",
            runtime_version
        ));

        let spec = self.generator.generate(runtime_version, payload)?;
        events.state(RunState::Building);
        let image = self.builder.build(&spec, events).await?;

        let container = self.reconciler.reconcile(&image).await?;
        events.state(RunState::Created);

        let health = self.health.check(&container, events).await?;
        events.state(health.state());

        info!(id = %container.id, state = %health.state(), "Container run finished");
        Ok(ContainerReport {
            dockerfile: spec.dockerfile,
            image,
            container,
            health,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, LaunchBehavior, MemoryEngine};
    use crate::log::RunEvent;
    use mdrun_foundation::EmbedMode;

    fn config(dir: &std::path::Path) -> RunnerConfig {
        let mut config = RunnerConfig::default()
            .build_dir(dir)
            .embed(EmbedMode::Inline);
        config.timeouts.startup_secs = 1;
        config.timeouts.poll_interval_ms = 10;
        config
    }

    fn states(rx: &mut tokio::sync::mpsc::UnboundedReceiver<RunEvent>) -> Vec<String> {
        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::State(state) = event {
                states.push(state.display_name().to_string());
            }
        }
        states
    }

    #[tokio::test]
    async fn test_completed_run() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            MemoryEngine::new()
                .with_launch(LaunchBehavior::Exits(0))
                .with_output("hi\n"),
        );
        let pipeline = ContainerPipeline::new(engine.clone(), &config(dir.path()));
        let (sink, mut rx) = EventSink::channel();

        let report = pipeline
            .run("3.12.2", &AggregatedPayload::from_blocks(["print('hi')"]), &sink)
            .await
            .unwrap();

        assert_eq!(report.state(), RunState::Completed);
        assert_eq!(report.container.name, "python-script-container");
        let dockerfile = std::fs::read_to_string(&report.dockerfile).unwrap();
        assert!(dockerfile.contains("FROM python:3.12.2-slim"));
        assert_eq!(
            states(&mut rx),
            vec!["Absent", "Building", "Created", "Completed"]
        );
    }

    #[tokio::test]
    async fn test_build_failure_skips_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MemoryEngine::new().with_build_error("no such image"));
        let pipeline = ContainerPipeline::new(engine.clone(), &config(dir.path()));
        let (sink, mut rx) = EventSink::channel();

        let err = pipeline
            .run("3.12.2", &AggregatedPayload::new(), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Build(_)));
        assert_eq!(
            engine.calls(),
            vec![EngineCall::Build {
                tag: "python-script".into()
            }]
        );
        assert_eq!(states(&mut rx), vec!["Absent", "Building", "Failed"]);
    }

    #[tokio::test]
    async fn test_generation_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MemoryEngine::new());
        let pipeline = ContainerPipeline::new(engine.clone(), &config(dir.path()));

        let err = pipeline
            .run("", &AggregatedPayload::new(), &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Generation(_)));
        assert!(engine.calls().is_empty());
    }
}
