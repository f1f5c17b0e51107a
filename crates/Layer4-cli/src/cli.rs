//! `mdrun run` - execute a markdown document

use crate::output;
use anyhow::{bail, Context};
use clap::Args;
use mdrun_core::{Aggregate, CodeRunner, EventSink, RunOutcome};
use mdrun_foundation::{EmbedMode, RunnerConfig};
use mdrun_task::{ContainerEngine, DockerEngine, Health};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Markdown file to run
    pub file: PathBuf,

    /// Python version for the base image (python:<version>-slim)
    #[arg(env = "MDRUN_PYTHON_VERSION")]
    pub python_version: Option<String>,

    /// Print the prepared code (or query rows) and stop
    #[arg(long)]
    pub print_code: bool,

    /// Embed the payload with a single RUN line instead of copying script.py
    #[arg(long)]
    pub inline: bool,

    /// Image tag to build
    #[arg(long)]
    pub image_tag: Option<String>,

    /// Logical container name
    #[arg(long)]
    pub container_name: Option<String>,

    /// Directory for the generated Dockerfile
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Print query rows as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Global config, then project config, then flags
    fn config(&self) -> anyhow::Result<RunnerConfig> {
        let config = RunnerConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}", e);
            RunnerConfig::default()
        });
        self.apply(config)
    }

    /// Flags win over whatever the config files set
    fn apply(&self, mut config: RunnerConfig) -> anyhow::Result<RunnerConfig> {
        if let Some(version) = &self.python_version {
            config = config.python_version(version.clone());
        }
        if let Some(tag) = &self.image_tag {
            config = config.image_tag(tag.clone());
        }
        if let Some(name) = &self.container_name {
            config = config.container_name(name.clone());
        }
        if let Some(dir) = &self.build_dir {
            config = config.build_dir(dir.clone());
        }
        if self.inline {
            config = config.embed(EmbedMode::Inline);
        }

        config.validate()?;
        Ok(config)
    }
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let runner = CodeRunner::from_path(&args.file, config.python_version.clone())?
        .with_config(config);
    tracing::debug!(
        file = %args.file.display(),
        python = %runner.python_version(),
        "Loaded document"
    );

    // SQL documents and --print-code never need the container engine
    let aggregate = runner.get_code()?;
    if let Aggregate::Query(result) = &aggregate {
        return print_rows(result, args.json);
    }
    if args.print_code {
        if let Aggregate::Script(payload) = &aggregate {
            println!("{}", payload.inline());
        }
        return Ok(());
    }

    let engine = DockerEngine::connect().context("Failed to connect to Docker")?;
    engine
        .ping()
        .await
        .context("Docker is not reachable, is the daemon running?")?;
    let engine: Arc<dyn ContainerEngine> = Arc::new(engine);

    let (sink, mut rx) = EventSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            output::print_event(&event);
        }
    });

    let result = tokio::select! {
        result = runner.run(engine, &sink) => result,
        _ = tokio::signal::ctrl_c() => {
            bail!("Interrupted; the container and image are left as they are")
        }
    };

    drop(sink);
    let _ = printer.await;

    match result? {
        RunOutcome::Query(rows) => print_rows(&rows, args.json),
        RunOutcome::Container(report) => {
            match &report.health {
                Health::Running { id } => {
                    println!("Container {} is running ({})", report.container.name, id)
                }
                Health::Completed { .. } => {
                    println!("Container {} finished", report.container.name)
                }
            }
            Ok(())
        }
    }
}

fn print_rows(result: &mdrun_core::QueryResult, json: bool) -> anyhow::Result<()> {
    if json {
        output::print_json(result)
    } else {
        output::print_table(result);
        Ok(())
    }
}
