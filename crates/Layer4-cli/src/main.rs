//! mdrun CLI - Main entry point

mod cli;
mod init;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// mdrun - run the code blocks of a markdown document
#[derive(Parser, Debug)]
#[command(name = "mdrun")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the python (or sql) blocks of a markdown file
    Run(cli::RunArgs),
    /// Write a project config (.mdrun/config.json) with the current settings
    Init {
        /// Overwrite an existing project config
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match args.command {
        Command::Run(run) => cli::run(run).await,
        Command::Init { force } => init::init_project(force, &PathBuf::from(".")),
    }
}
