//! Code runner
//!
//! Entry point for one markdown document: extract code, aggregate it, then
//! either return query rows or drive the container pipeline.

use crate::aggregate::{Aggregate, CodeAggregator};
use crate::markdown::iterate_code_chunks;
use crate::query::{QueryExecutor, QueryResult, SqliteExecutor};
use mdrun_foundation::{Error, Result, RunnerConfig};
use mdrun_task::{ContainerEngine, ContainerPipeline, ContainerReport, EventSink, RunError};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Result of running a document
#[derive(Debug, Clone, Serialize)]
pub enum RunOutcome {
    /// Document contained SQL; no container was touched
    Query(QueryResult),
    /// Python payload ran in a container
    Container(ContainerReport),
}

pub struct CodeRunner {
    markdown: String,
    python_version: String,
    config: RunnerConfig,
    /// Created on first use and kept for the runner's lifetime
    executor: OnceLock<Arc<dyn QueryExecutor>>,
}

impl CodeRunner {
    pub fn new(markdown: impl Into<String>, python_version: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            python_version: python_version.into(),
            config: RunnerConfig::default(),
            executor: OnceLock::new(),
        }
    }

    /// Read the document from disk
    pub fn from_path(path: impl AsRef<Path>, python_version: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let markdown = std::fs::read_to_string(path)
            .map_err(|e| Error::Parse(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Self::new(markdown, python_version))
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Query executor for SQL blocks (default: one in-memory SQLite connection per runner)
    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = OnceLock::from(executor);
        self
    }

    pub fn python_version(&self) -> &str {
        &self.python_version
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Payload or query rows, without touching the container engine
    pub fn get_code(&self) -> Result<Aggregate> {
        let executor = self.executor()?;
        CodeAggregator::new(executor.as_ref()).aggregate(iterate_code_chunks(&self.markdown))
    }

    fn executor(&self) -> Result<Arc<dyn QueryExecutor>> {
        if let Some(executor) = self.executor.get() {
            return Ok(executor.clone());
        }
        let executor: Arc<dyn QueryExecutor> = Arc::new(SqliteExecutor::in_memory()?);
        Ok(self.executor.get_or_init(|| executor).clone())
    }

    pub async fn run(
        &self,
        engine: Arc<dyn ContainerEngine>,
        events: &EventSink,
    ) -> std::result::Result<RunOutcome, RunError> {
        match self.get_code()? {
            Aggregate::Query(result) => {
                info!(rows = result.rows.len(), "Query executed, no container needed");
                Ok(RunOutcome::Query(result))
            }
            Aggregate::Script(payload) => {
                info!(
                    blocks = payload.block_count(),
                    engine = engine.name(),
                    python = %self.python_version,
                    "Running payload in container"
                );
                let report = ContainerPipeline::new(engine, &self.config)
                    .run(&self.python_version, &payload, events)
                    .await?;
                Ok(RunOutcome::Container(report))
            }
        }
    }
}
