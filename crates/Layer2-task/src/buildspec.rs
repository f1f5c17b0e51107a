//! Build specification (Dockerfile) generation
//!
//! The spec is written to a fixed path inside the build directory and
//! overwritten on every run. There is no locking: two processes sharing a
//! build directory will clobber each other's Dockerfile.

use crate::error::RunError;
use crate::payload::AggregatedPayload;
use mdrun_foundation::EmbedMode;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Generated build file name
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Script file name, both in the build context and inside the image
pub const SCRIPT_NAME: &str = "script.py";

/// Working directory inside the image
pub const WORKDIR: &str = "/usr/src/app";

/// A generated build spec on disk
#[derive(Debug, Clone)]
pub struct BuildSpec {
    /// Build context directory
    pub dir: PathBuf,
    /// Path of the written Dockerfile
    pub dockerfile: PathBuf,
    /// Rendered Dockerfile text
    pub content: String,
    /// Script written next to the Dockerfile (context-file mode only)
    pub script: Option<PathBuf>,
}

/// Renders and writes the Dockerfile for one payload
#[derive(Debug, Clone)]
pub struct BuildSpecGenerator {
    build_dir: PathBuf,
    embed: EmbedMode,
}

impl BuildSpecGenerator {
    pub fn new(build_dir: impl Into<PathBuf>, embed: EmbedMode) -> Self {
        Self {
            build_dir: build_dir.into(),
            embed,
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn embed(&self) -> EmbedMode {
        self.embed
    }

    /// Render the Dockerfile text. Deterministic for the same inputs.
    pub fn render(
        &self,
        runtime_version: &str,
        payload: &AggregatedPayload,
    ) -> Result<String, RunError> {
        validate_version(runtime_version)?;

        let materialize = match self.embed {
            EmbedMode::Inline => format!(
                "RUN printf '%s\\n' \"{}\" > {}",
                escape_double_quoted(&payload.inline()),
                SCRIPT_NAME
            ),
            EmbedMode::ContextFile => format!("COPY {0} ./{0}", SCRIPT_NAME),
        };

        Ok(format!(
            "FROM python:{version}-slim\n\
             \n\
             WORKDIR {workdir}\n\
             \n\
             {materialize}\n\
             \n\
             CMD [\"python\", \"./{script}\"]\n",
            version = runtime_version,
            workdir = WORKDIR,
            materialize = materialize,
            script = SCRIPT_NAME,
        ))
    }

    /// Render and write the spec (and the script in context-file mode)
    pub fn generate(
        &self,
        runtime_version: &str,
        payload: &AggregatedPayload,
    ) -> Result<BuildSpec, RunError> {
        let content = self.render(runtime_version, payload)?;

        std::fs::create_dir_all(&self.build_dir)?;
        let dockerfile = self.build_dir.join(DOCKERFILE_NAME);
        std::fs::write(&dockerfile, &content)?;

        let script_path = self.build_dir.join(SCRIPT_NAME);
        let script = match self.embed {
            EmbedMode::ContextFile => {
                std::fs::write(&script_path, payload.script())?;
                Some(script_path)
            }
            EmbedMode::Inline => {
                // a script left over from a context-file run would be shipped needlessly
                if script_path.exists() {
                    std::fs::remove_file(&script_path)?;
                }
                None
            }
        };

        debug!(
            path = %dockerfile.display(),
            blocks = payload.block_count(),
            "Wrote build spec"
        );

        Ok(BuildSpec {
            dir: self.build_dir.clone(),
            dockerfile,
            content,
            script,
        })
    }
}

fn validate_version(version: &str) -> Result<(), RunError> {
    if version.trim().is_empty() {
        return Err(RunError::Generation(
            "runtime version must not be empty".to_string(),
        ));
    }
    if version.chars().any(|c| c.is_whitespace()) {
        return Err(RunError::Generation(format!(
            "runtime version must not contain whitespace: {:?}",
            version
        )));
    }
    Ok(())
}

/// Escape the characters `sh` still interprets inside double quotes
fn escape_double_quoted(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
