//! Image builder - builds the generated spec under a fixed tag

use crate::buildspec::{BuildSpec, DOCKERFILE_NAME};
use crate::engine::{with_deadline, ContainerEngine, ImageInfo};
use crate::error::RunError;
use crate::log::EventSink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builds images from a [`BuildSpec`]. Each build replaces the previous
/// image under the same tag; failures are reported, never retried.
pub struct ImageBuilder {
    engine: Arc<dyn ContainerEngine>,
    tag: String,
    timeout: Duration,
}

impl ImageBuilder {
    pub fn new(engine: Arc<dyn ContainerEngine>, tag: impl Into<String>, timeout: Duration) -> Self {
        Self {
            engine,
            tag: tag.into(),
            timeout,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub async fn build(&self, spec: &BuildSpec, events: &EventSink) -> Result<ImageInfo, RunError> {
        info!(tag = %self.tag, engine = self.engine.name(), "Building image");
        events.system("Building image . . .");

        let on_log = |line: &str| events.build_log(line);
        let result = with_deadline(
            "image build",
            self.timeout,
            self.engine
                .build_image(&spec.dir, DOCKERFILE_NAME, &self.tag, &on_log),
        )
        .await;

        match result {
            Ok(image) => {
                events.system(format!("Created a new python image {}", image.id));
                Ok(image)
            }
            Err(e) => {
                warn!(tag = %self.tag, error = %e, "Image build failed");
                Err(RunError::Build(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildspec::BuildSpecGenerator;
    use crate::engine::MemoryEngine;
    use crate::error::EngineError;
    use crate::log::{LogSource, RunEvent};
    use crate::payload::AggregatedPayload;
    use mdrun_foundation::EmbedMode;

    fn spec_in(dir: &std::path::Path) -> BuildSpec {
        BuildSpecGenerator::new(dir, EmbedMode::Inline)
            .generate("3.12.2", &AggregatedPayload::from_blocks(["print('hi')"]))
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_streams_logs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MemoryEngine::new().with_build_logs(["Step 1/4", "Step 2/4", "done"]));
        let builder = ImageBuilder::new(engine.clone(), "python-script", Duration::from_secs(5));
        let (sink, mut rx) = EventSink::channel();

        let image = builder.build(&spec_in(dir.path()), &sink).await.unwrap();
        drop(sink);

        assert_eq!(image.tag, "python-script");
        assert_eq!(engine.image_id("python-script"), Some(image.id));

        let mut build_lines = Vec::new();
        while let Some(event) = rx.recv().await {
            if let RunEvent::Log(entry) = event {
                if entry.source == LogSource::Build {
                    build_lines.push(entry.content);
                }
            }
        }
        assert_eq!(build_lines, vec!["Step 1/4", "Step 2/4", "done"]);
    }

    #[tokio::test]
    async fn test_build_failure_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            MemoryEngine::new().with_build_error("The command '/bin/sh -c ...' returned a non-zero code: 1"),
        );
        let builder = ImageBuilder::new(engine, "python-script", Duration::from_secs(5));

        let err = builder
            .build(&spec_in(dir.path()), &EventSink::disabled())
            .await
            .unwrap_err();

        match err {
            RunError::Build(EngineError::BuildFailed(message)) => {
                assert!(message.contains("non-zero code"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rebuild_replaces_tag() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MemoryEngine::new());
        let builder = ImageBuilder::new(engine.clone(), "python-script", Duration::from_secs(5));
        let spec = spec_in(dir.path());

        let first = builder.build(&spec, &EventSink::disabled()).await.unwrap();
        let second = builder.build(&spec, &EventSink::disabled()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(engine.image_id("python-script"), Some(second.id));
    }
}
